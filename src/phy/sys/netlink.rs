use std::os::unix::io::{AsRawFd, RawFd};
use std::{io, mem};

/// A `NETLINK_ROUTE` socket.
#[derive(Debug)]
pub struct NetlinkDesc {
    lower: libc::c_int,
}

impl AsRawFd for NetlinkDesc {
    fn as_raw_fd(&self) -> RawFd {
        self.lower
    }
}

impl NetlinkDesc {
    pub fn new() -> io::Result<NetlinkDesc> {
        let lower = unsafe {
            libc::socket(
                libc::AF_NETLINK,
                libc::SOCK_RAW | libc::SOCK_CLOEXEC,
                libc::NETLINK_ROUTE,
            )
        };
        if lower == -1 {
            return Err(io::Error::last_os_error());
        }
        let desc = NetlinkDesc { lower };

        let mut addr: libc::sockaddr_nl = unsafe { mem::zeroed() };
        addr.nl_family = libc::AF_NETLINK as libc::sa_family_t;
        let res = unsafe {
            libc::bind(
                lower,
                &addr as *const libc::sockaddr_nl as *const libc::sockaddr,
                mem::size_of::<libc::sockaddr_nl>() as libc::socklen_t,
            )
        };
        if res == -1 {
            return Err(io::Error::last_os_error());
        }
        Ok(desc)
    }

    /// Send one request to the kernel.
    pub fn send(&mut self, buffer: &[u8]) -> io::Result<usize> {
        let len = unsafe {
            libc::send(
                self.lower,
                buffer.as_ptr() as *const libc::c_void,
                buffer.len(),
                0,
            )
        };
        if len == -1 {
            return Err(io::Error::last_os_error());
        }
        Ok(len as usize)
    }

    /// Block until the kernel answers.
    pub fn recv(&mut self, buffer: &mut [u8]) -> io::Result<usize> {
        let len = unsafe {
            libc::recv(
                self.lower,
                buffer.as_mut_ptr() as *mut libc::c_void,
                buffer.len(),
                0,
            )
        };
        if len == -1 {
            return Err(io::Error::last_os_error());
        }
        Ok(len as usize)
    }
}

impl Drop for NetlinkDesc {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.lower);
        }
    }
}
