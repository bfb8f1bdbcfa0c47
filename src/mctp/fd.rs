// Copyright 2026 BadCompany
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::io;
use std::os::fd::{AsRawFd, OwnedFd, RawFd};
use tokio::io::unix::AsyncFd;

/// Non-blocking socket registered with the tokio reactor.
///
/// The descriptor is closed exactly once, when this value is dropped.
#[derive(Debug)]
pub struct AsyncSocket {
    inner: AsyncFd<OwnedFd>,
}

impl AsyncSocket {
    pub fn new(fd: OwnedFd) -> io::Result<Self> {
        Ok(Self {
            inner: AsyncFd::new(fd)?,
        })
    }

    pub fn as_raw_fd(&self) -> RawFd {
        self.inner.as_raw_fd()
    }

    /// Retry `op` until the socket accepts it without `EWOULDBLOCK`.
    pub async fn write_with<R>(&self, mut op: impl FnMut(RawFd) -> io::Result<R>) -> io::Result<R> {
        loop {
            let mut guard = self.inner.writable().await?;
            match guard.try_io(|inner| op(inner.as_raw_fd())) {
                Ok(result) => return result,
                Err(_would_block) => continue,
            }
        }
    }

    /// Wait for readability and run `op`, retrying on `EWOULDBLOCK`.
    pub async fn read_with<R>(&self, mut op: impl FnMut(RawFd) -> io::Result<R>) -> io::Result<R> {
        loop {
            let mut guard = self.inner.readable().await?;
            match guard.try_io(|inner| op(inner.as_raw_fd())) {
                Ok(result) => return result,
                Err(_would_block) => continue,
            }
        }
    }
}
