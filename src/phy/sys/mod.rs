#![allow(unsafe_code)]

use std::ffi::{CStr, CString};
use std::os::unix::io::RawFd;
use std::{fs, io, ptr};

use crate::time::Duration;
use crate::wire::Ipv6Address;

pub mod netlink;
pub mod raw_socket;

pub use self::netlink::NetlinkDesc;
pub use self::raw_socket::Icmpv6SocketDesc;

/// Wait until given file descriptor becomes readable, but no longer than given timeout.
///
/// A signal interrupting the wait is not an error.
pub fn wait(fd: RawFd, duration: Option<Duration>) -> io::Result<()> {
    let mut pollfd = libc::pollfd {
        fd,
        events: libc::POLLIN,
        revents: 0,
    };
    // Rounded up, so a deadline less than a millisecond away does not spin.
    let timeout = match duration {
        Some(duration) => {
            let millis = (duration.total_micros() + 999) / 1000;
            millis.min(libc::c_int::MAX as u64) as libc::c_int
        }
        None => -1,
    };

    let res = unsafe { libc::poll(&mut pollfd, 1, timeout) };
    if res == -1 {
        let err = io::Error::last_os_error();
        if err.kind() != io::ErrorKind::Interrupted {
            return Err(err);
        }
    }
    Ok(())
}

/// Return the index of the interface called `name`.
pub fn if_nametoindex(name: &str) -> io::Result<u32> {
    let name = CString::new(name)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "interface name contains NUL"))?;
    let index = unsafe { libc::if_nametoindex(name.as_ptr()) };
    if index == 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(index)
}

/// Return the IPv6 addresses assigned to the interface called `name`.
pub fn interface_addresses(name: &str) -> io::Result<Vec<Ipv6Address>> {
    let mut ifap: *mut libc::ifaddrs = ptr::null_mut();
    if unsafe { libc::getifaddrs(&mut ifap) } == -1 {
        return Err(io::Error::last_os_error());
    }

    let mut addresses = Vec::new();
    let mut cursor = ifap;
    while !cursor.is_null() {
        let ifa = unsafe { &*cursor };
        cursor = ifa.ifa_next;

        if ifa.ifa_addr.is_null() || ifa.ifa_name.is_null() {
            continue;
        }
        if unsafe { CStr::from_ptr(ifa.ifa_name) }.to_bytes() != name.as_bytes() {
            continue;
        }
        if i32::from(unsafe { (*ifa.ifa_addr).sa_family }) != libc::AF_INET6 {
            continue;
        }
        let sin6 = unsafe { ptr::read_unaligned(ifa.ifa_addr as *const libc::sockaddr_in6) };
        addresses.push(Ipv6Address::from(sin6.sin6_addr.s6_addr));
    }

    unsafe { libc::freeifaddrs(ifap) };
    Ok(addresses)
}

/// Write `value` to a file under `/proc/sys`.
pub fn write_sysctl(path: &str, value: u32) -> io::Result<()> {
    fs::write(path, format!("{}\n", value))
}
