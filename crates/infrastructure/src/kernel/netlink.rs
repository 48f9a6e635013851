//! rtnetlink wire helpers for IPv4 route messages.

use ipnetwork::Ipv4Network;
use std::io;
use std::mem;
use std::net::Ipv4Addr;
use std::os::unix::io::{AsRawFd, RawFd};
use std::time::Duration;

const _: () = assert!(mem::size_of::<NlMsgHdr>() == 16);
const _: () = assert!(mem::size_of::<RtMsg>() == 12);
const _: () = assert!(mem::size_of::<RtNextHop>() == 8);

pub const NETLINK_ROUTE: i32 = libc::NETLINK_ROUTE;
pub const AF_NETLINK: i32 = libc::AF_NETLINK;

// Netlink message header flags
pub const NLM_F_REQUEST: u16 = 0x01;
pub const NLM_F_MULTI: u16 = 0x02;
pub const NLM_F_ACK: u16 = 0x04;
pub const NLM_F_REPLACE: u16 = 0x100;
pub const NLM_F_EXCL: u16 = 0x200;
pub const NLM_F_CREATE: u16 = 0x400;
pub const NLM_F_DUMP: u16 = 0x300;

// Netlink message types
pub const NLMSG_ERROR: u16 = 0x02;
pub const NLMSG_DONE: u16 = 0x03;
pub const RTM_NEWROUTE: u16 = 24;
pub const RTM_DELROUTE: u16 = 25;
pub const RTM_GETROUTE: u16 = 26;

// Route attributes
pub const RTA_DST: u16 = 1;
pub const RTA_GATEWAY: u16 = 5;
pub const RTA_PRIORITY: u16 = 6;
pub const RTA_MULTIPATH: u16 = 9;
pub const RTA_TABLE: u16 = 15;

pub const RT_TABLE_MAIN: u8 = 254;
pub const RT_SCOPE_UNIVERSE: u8 = 0;
pub const RTN_UNICAST: u8 = 1;
pub const AF_INET: u8 = libc::AF_INET as u8;

pub const NLMSG_ALIGNTO: usize = 4;
pub const RTA_ALIGNTO: usize = 4;

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

#[inline]
pub fn nlmsg_align(len: usize) -> usize {
    (len + NLMSG_ALIGNTO - 1) & !(NLMSG_ALIGNTO - 1)
}

#[inline]
pub fn rta_align(len: usize) -> usize {
    (len + RTA_ALIGNTO - 1) & !(RTA_ALIGNTO - 1)
}

/// Netlink message header (struct nlmsghdr)
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NlMsgHdr {
    pub nlmsg_len: u32,
    pub nlmsg_type: u16,
    pub nlmsg_flags: u16,
    pub nlmsg_seq: u32,
    pub nlmsg_pid: u32,
}

impl NlMsgHdr {
    pub const SIZE: usize = mem::size_of::<NlMsgHdr>();

    pub fn parse(buf: &[u8]) -> Option<Self> {
        if buf.len() < Self::SIZE {
            return None;
        }
        Some(Self {
            nlmsg_len: read_u32(buf, 0)?,
            nlmsg_type: read_u16(buf, 4)?,
            nlmsg_flags: read_u16(buf, 6)?,
            nlmsg_seq: read_u32(buf, 8)?,
            nlmsg_pid: read_u32(buf, 12)?,
        })
    }
}

/// Route message header (struct rtmsg)
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RtMsg {
    pub rtm_family: u8,
    pub rtm_dst_len: u8,
    pub rtm_src_len: u8,
    pub rtm_tos: u8,
    pub rtm_table: u8,
    pub rtm_protocol: u8,
    pub rtm_scope: u8,
    pub rtm_type: u8,
    pub rtm_flags: u32,
}

impl RtMsg {
    pub const SIZE: usize = mem::size_of::<RtMsg>();

    /// Unicast IPv4 route in the main table.
    pub fn ipv4_unicast(dst_len: u8, protocol: u8) -> Self {
        Self {
            rtm_family: AF_INET,
            rtm_dst_len: dst_len,
            rtm_table: RT_TABLE_MAIN,
            rtm_protocol: protocol,
            rtm_scope: RT_SCOPE_UNIVERSE,
            rtm_type: RTN_UNICAST,
            ..Self::default()
        }
    }

    pub fn parse(buf: &[u8]) -> Option<Self> {
        if buf.len() < Self::SIZE {
            return None;
        }
        Some(Self {
            rtm_family: buf[0],
            rtm_dst_len: buf[1],
            rtm_src_len: buf[2],
            rtm_tos: buf[3],
            rtm_table: buf[4],
            rtm_protocol: buf[5],
            rtm_scope: buf[6],
            rtm_type: buf[7],
            rtm_flags: read_u32(buf, 8)?,
        })
    }
}

/// Multipath next-hop header (struct rtnexthop)
#[repr(C)]
#[derive(Clone, Copy, Debug, Default)]
pub struct RtNextHop {
    pub rtnh_len: u16,
    pub rtnh_flags: u8,
    pub rtnh_hops: u8,
    pub rtnh_ifindex: i32,
}

impl RtNextHop {
    pub const SIZE: usize = mem::size_of::<RtNextHop>();
}

fn read_u16(buf: &[u8], at: usize) -> Option<u16> {
    let bytes = buf.get(at..at + 2)?;
    Some(u16::from_ne_bytes([bytes[0], bytes[1]]))
}

fn read_u32(buf: &[u8], at: usize) -> Option<u32> {
    let bytes = buf.get(at..at + 4)?;
    Some(u32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// A NETLINK_ROUTE socket. Blocking, used from `spawn_blocking`.
pub struct NetlinkSocket {
    fd: RawFd,
}

impl NetlinkSocket {
    pub fn new() -> io::Result<Self> {
        let fd = unsafe {
            libc::socket(
                AF_NETLINK,
                libc::SOCK_RAW | libc::SOCK_CLOEXEC,
                NETLINK_ROUTE,
            )
        };

        if fd < 0 {
            return Err(io::Error::last_os_error());
        }

        // Drop closes the fd on the error paths below.
        let socket = Self { fd };

        let mut addr: libc::sockaddr_nl = unsafe { mem::zeroed() };
        addr.nl_family = AF_NETLINK as u16;

        let ret = unsafe {
            libc::bind(
                fd,
                &addr as *const libc::sockaddr_nl as *const libc::sockaddr,
                mem::size_of::<libc::sockaddr_nl>() as u32,
            )
        };
        if ret < 0 {
            return Err(io::Error::last_os_error());
        }

        let timeout = libc::timeval {
            tv_sec: RECV_TIMEOUT.as_secs() as libc::time_t,
            tv_usec: 0,
        };
        let ret = unsafe {
            libc::setsockopt(
                fd,
                libc::SOL_SOCKET,
                libc::SO_RCVTIMEO,
                &timeout as *const libc::timeval as *const libc::c_void,
                mem::size_of::<libc::timeval>() as u32,
            )
        };
        if ret < 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(socket)
    }

    pub fn send(&self, msg: &[u8]) -> io::Result<()> {
        let mut addr: libc::sockaddr_nl = unsafe { mem::zeroed() };
        addr.nl_family = AF_NETLINK as u16;

        let mut retries = 3;
        loop {
            let sent = unsafe {
                libc::sendto(
                    self.fd,
                    msg.as_ptr() as *const libc::c_void,
                    msg.len(),
                    0,
                    &addr as *const libc::sockaddr_nl as *const libc::sockaddr,
                    mem::size_of::<libc::sockaddr_nl>() as u32,
                )
            };

            if sent < 0 {
                let err = io::Error::last_os_error();
                if retries > 0 && is_transient(&err) {
                    retries -= 1;
                    std::thread::sleep(Duration::from_millis(10));
                    continue;
                }
                return Err(err);
            }

            if sent as usize != msg.len() {
                return Err(io::Error::other("incomplete send"));
            }
            return Ok(());
        }
    }

    pub fn recv(&self, recv_buf: &mut [u8]) -> io::Result<usize> {
        let mut retries = 3;
        loop {
            let received = unsafe {
                libc::recv(
                    self.fd,
                    recv_buf.as_mut_ptr() as *mut libc::c_void,
                    recv_buf.len(),
                    0,
                )
            };

            if received < 0 {
                let err = io::Error::last_os_error();
                if retries > 0 && err.raw_os_error() == Some(libc::EINTR) {
                    retries -= 1;
                    continue;
                }
                return Err(err);
            }

            return Ok(received as usize);
        }
    }
}

fn is_transient(err: &io::Error) -> bool {
    matches!(
        err.raw_os_error(),
        Some(libc::EAGAIN) | Some(libc::EINTR)
    ) || err.kind() == io::ErrorKind::WouldBlock
}

impl AsRawFd for NetlinkSocket {
    fn as_raw_fd(&self) -> RawFd {
        self.fd
    }
}

impl Drop for NetlinkSocket {
    fn drop(&mut self) {
        unsafe { libc::close(self.fd) };
    }
}

/// Buffer for building netlink messages.
pub struct MsgBuffer {
    data: Vec<u8>,
}

impl MsgBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    pub fn put_bytes(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    pub fn put_u8(&mut self, val: u8) {
        self.data.push(val);
    }

    pub fn put_u16(&mut self, val: u16) {
        self.data.extend_from_slice(&val.to_ne_bytes());
    }

    pub fn put_u32(&mut self, val: u32) {
        self.data.extend_from_slice(&val.to_ne_bytes());
    }

    pub fn put_i32(&mut self, val: i32) {
        self.data.extend_from_slice(&val.to_ne_bytes());
    }

    /// Pad to alignment.
    pub fn align(&mut self) {
        let aligned = rta_align(self.data.len());
        self.data.resize(aligned, 0);
    }

    /// Add the netlink message header. The length is filled in by `finalize_nlmsg`.
    pub fn put_nlmsghdr(&mut self, msg_type: u16, flags: u16, seq: u32) {
        self.put_u32(0);
        self.put_u16(msg_type);
        self.put_u16(flags);
        self.put_u32(seq);
        self.put_u32(0);
    }

    pub fn put_rtmsg(&mut self, msg: &RtMsg) {
        self.put_bytes(&[
            msg.rtm_family,
            msg.rtm_dst_len,
            msg.rtm_src_len,
            msg.rtm_tos,
            msg.rtm_table,
            msg.rtm_protocol,
            msg.rtm_scope,
            msg.rtm_type,
        ]);
        self.put_u32(msg.rtm_flags);
    }

    pub fn put_attr_u32(&mut self, attr_type: u16, val: u32) {
        self.put_u16(4 + 4);
        self.put_u16(attr_type);
        self.put_u32(val);
        self.align();
    }

    pub fn put_attr_ipv4(&mut self, attr_type: u16, addr: Ipv4Addr) {
        self.put_u16(4 + 4);
        self.put_u16(attr_type);
        self.put_bytes(&addr.octets());
        self.align();
    }

    /// Start an attribute whose payload follows. Returns the offset of its length.
    pub fn start_attr(&mut self, attr_type: u16) -> usize {
        let offset = self.data.len();
        self.put_u16(0);
        self.put_u16(attr_type);
        offset
    }

    pub fn end_attr(&mut self, offset: usize) {
        let len = (self.data.len() - offset) as u16;
        self.data[offset..offset + 2].copy_from_slice(&len.to_ne_bytes());
    }

    /// Start a `rtnexthop` entry. Returns the offset of its length.
    pub fn start_nexthop(&mut self) -> usize {
        let offset = self.data.len();
        self.put_u16(0);
        self.put_u8(0);
        self.put_u8(0);
        self.put_i32(0);
        offset
    }

    pub fn end_nexthop(&mut self, offset: usize) {
        let len = (self.data.len() - offset) as u16;
        self.data[offset..offset + 2].copy_from_slice(&len.to_ne_bytes());
    }

    /// Update the netlink message header length at the beginning of the buffer.
    pub fn finalize_nlmsg(&mut self) {
        let len = self.data.len() as u32;
        self.data[0..4].copy_from_slice(&len.to_ne_bytes());
    }
}

/// Request to add, replace or delete one route.
pub fn route_request(
    msg_type: u16,
    flags: u16,
    seq: u32,
    protocol: u8,
    destination: Ipv4Network,
    metric: u32,
    next_hops: &[Ipv4Addr],
) -> Vec<u8> {
    let mut buf = MsgBuffer::new(128);
    buf.put_nlmsghdr(msg_type, NLM_F_REQUEST | NLM_F_ACK | flags, seq);
    buf.put_rtmsg(&RtMsg::ipv4_unicast(destination.prefix(), protocol));
    buf.put_attr_ipv4(RTA_DST, destination.network());
    buf.put_attr_u32(RTA_PRIORITY, metric);
    buf.put_attr_u32(RTA_TABLE, u32::from(RT_TABLE_MAIN));

    match next_hops {
        [] => {}
        [single] => buf.put_attr_ipv4(RTA_GATEWAY, *single),
        many => {
            let mp = buf.start_attr(RTA_MULTIPATH);
            for hop in many {
                let nh = buf.start_nexthop();
                buf.put_attr_ipv4(RTA_GATEWAY, *hop);
                buf.end_nexthop(nh);
            }
            buf.end_attr(mp);
        }
    }

    buf.finalize_nlmsg();
    buf.into_vec()
}

/// Dump request for every IPv4 route.
pub fn dump_request(seq: u32) -> Vec<u8> {
    let mut buf = MsgBuffer::new(32);
    buf.put_nlmsghdr(RTM_GETROUTE, NLM_F_REQUEST | NLM_F_DUMP, seq);
    buf.put_rtmsg(&RtMsg {
        rtm_family: AF_INET,
        ..RtMsg::default()
    });
    buf.finalize_nlmsg();
    buf.into_vec()
}

/// One message inside a netlink datagram.
pub struct NlMessage<'a> {
    pub header: NlMsgHdr,
    pub payload: &'a [u8],
}

/// Split a datagram into its messages.
pub fn messages(buf: &[u8]) -> Vec<NlMessage<'_>> {
    let mut out = Vec::new();
    let mut offset = 0;
    while let Some(header) = NlMsgHdr::parse(&buf[offset..]) {
        let len = header.nlmsg_len as usize;
        if len < NlMsgHdr::SIZE || offset + len > buf.len() {
            break;
        }
        out.push(NlMessage {
            header,
            payload: &buf[offset + NlMsgHdr::SIZE..offset + len],
        });
        offset += nlmsg_align(len);
        if offset >= buf.len() {
            break;
        }
    }
    out
}

/// Error code carried by an NLMSG_ERROR payload (0 is an ACK).
pub fn error_code(msg: &NlMessage<'_>) -> Option<i32> {
    if msg.header.nlmsg_type != NLMSG_ERROR {
        return None;
    }
    read_u32(msg.payload, 0).map(|v| v as i32)
}

/// Route attributes as `(type, payload)` pairs.
pub fn attributes(buf: &[u8]) -> Vec<(u16, &[u8])> {
    let mut out = Vec::new();
    let mut offset = 0;
    while let (Some(len), Some(kind)) = (read_u16(buf, offset), read_u16(buf, offset + 2)) {
        let len = len as usize;
        if len < 4 || offset + len > buf.len() {
            break;
        }
        // Mask NLA_F_NESTED and NLA_F_NET_BYTEORDER.
        out.push((kind & 0x3fff, &buf[offset + 4..offset + len]));
        offset += rta_align(len);
    }
    out
}

/// A decoded RTM_NEWROUTE entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteEntry {
    pub header: RtMsg,
    pub destination: Ipv4Network,
    pub metric: u32,
    pub table: u32,
    pub next_hops: Vec<Ipv4Addr>,
}

fn ipv4(payload: &[u8]) -> Option<Ipv4Addr> {
    let b = payload.get(..4)?;
    Some(Ipv4Addr::new(b[0], b[1], b[2], b[3]))
}

/// Decode an RTM_NEWROUTE payload. Non-IPv4 routes yield `None`.
pub fn parse_route(payload: &[u8]) -> Option<RouteEntry> {
    let header = RtMsg::parse(payload)?;
    if header.rtm_family != AF_INET {
        return None;
    }

    let mut dst = Ipv4Addr::UNSPECIFIED;
    let mut metric = 0;
    let mut table = u32::from(header.rtm_table);
    let mut next_hops = Vec::new();

    for (kind, value) in attributes(&payload[RtMsg::SIZE..]) {
        match kind {
            RTA_DST => dst = ipv4(value)?,
            RTA_PRIORITY => metric = read_u32(value, 0)?,
            RTA_TABLE => table = read_u32(value, 0)?,
            RTA_GATEWAY => next_hops.push(ipv4(value)?),
            RTA_MULTIPATH => {
                let mut offset = 0;
                while let Some(len) = read_u16(value, offset) {
                    let len = len as usize;
                    if len < RtNextHop::SIZE || offset + len > value.len() {
                        break;
                    }
                    let nested = &value[offset + RtNextHop::SIZE..offset + len];
                    for (nk, nv) in attributes(nested) {
                        if nk == RTA_GATEWAY {
                            next_hops.push(ipv4(nv)?);
                        }
                    }
                    offset += rta_align(len);
                }
            }
            _ => {}
        }
    }

    let destination = Ipv4Network::new(dst, header.rtm_dst_len).ok()?;
    Some(RouteEntry {
        header,
        destination,
        metric,
        table,
        next_hops,
    })
}
