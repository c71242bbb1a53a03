//! Frame builders shared by the integration tests.

#![allow(dead_code)]

use fathom::{ByteRange, Frame, PacketNode, SessionTable};

pub const CLIENT: [u8; 4] = [10, 0, 0, 1];
pub const SERVER: [u8; 4] = [10, 0, 0, 2];

fn ipv4(protocol: u8, src: [u8; 4], dst: [u8; 4], transport: &[u8]) -> Vec<u8> {
    let total = (20 + transport.len()) as u16;
    let mut ip = vec![0x45, 0x00];
    ip.extend_from_slice(&total.to_be_bytes());
    ip.extend_from_slice(&[0x00, 0x01, 0x40, 0x00, 0x40, protocol, 0x00, 0x00]);
    ip.extend_from_slice(&src);
    ip.extend_from_slice(&dst);
    ip.extend_from_slice(transport);
    ip
}

/// Raw IPv4 packet holding a TCP segment from `src` to `dst`.
pub fn tcp(src: ([u8; 4], u16), dst: ([u8; 4], u16), payload: &[u8]) -> Vec<u8> {
    let mut segment = vec![];
    segment.extend_from_slice(&src.1.to_be_bytes());
    segment.extend_from_slice(&dst.1.to_be_bytes());
    segment.extend_from_slice(&[0, 0, 0, 1, 0, 0, 0, 0, 0x50, 0x18, 0xff, 0xff, 0, 0, 0, 0]);
    segment.extend_from_slice(payload);
    ipv4(6, src.0, dst.0, &segment)
}

/// Raw IPv4 packet holding a UDP datagram from `src` to `dst`.
pub fn udp(src: ([u8; 4], u16), dst: ([u8; 4], u16), payload: &[u8]) -> Vec<u8> {
    let mut datagram = vec![];
    datagram.extend_from_slice(&src.1.to_be_bytes());
    datagram.extend_from_slice(&dst.1.to_be_bytes());
    datagram.extend_from_slice(&((8 + payload.len()) as u16).to_be_bytes());
    datagram.extend_from_slice(&[0, 0]);
    datagram.extend_from_slice(payload);
    ipv4(17, src.0, dst.0, &datagram)
}

/// Prepends an Ethernet II header carrying IPv4.
pub fn ethernet(ip: &[u8]) -> Vec<u8> {
    let mut frame = vec![0x00, 0x22, 0x19, 0xb6, 0x7e, 0x22, 0x00, 0x0f, 0x35, 0xbb, 0x0b, 0x40];
    frame.extend_from_slice(&[0x08, 0x00]);
    frame.extend_from_slice(ip);
    frame
}

pub fn tls_record(content_type: u8, content: &[u8]) -> Vec<u8> {
    let mut r = vec![content_type, 0x03, 0x03];
    r.extend_from_slice(&(content.len() as u16).to_be_bytes());
    r.extend_from_slice(content);
    r
}

/// ClientHello handshake message carrying a server name.
pub fn client_hello(host: &str) -> Vec<u8> {
    let mut name = vec![0x00];
    name.extend_from_slice(&(host.len() as u16).to_be_bytes());
    name.extend_from_slice(host.as_bytes());
    let mut sni = (name.len() as u16).to_be_bytes().to_vec();
    sni.extend_from_slice(&name);

    let mut extensions = vec![0x00, 0x00];
    extensions.extend_from_slice(&(sni.len() as u16).to_be_bytes());
    extensions.extend_from_slice(&sni);

    let mut body = vec![0x03, 0x03];
    body.extend_from_slice(&[0x5a; 32]);
    body.push(0);
    body.extend_from_slice(&[0x00, 0x02, 0x13, 0x01, 0x01, 0x00]);
    body.extend_from_slice(&(extensions.len() as u16).to_be_bytes());
    body.extend_from_slice(&extensions);

    let mut message = vec![0x01, 0x00];
    message.extend_from_slice(&(body.len() as u16).to_be_bytes());
    message.extend_from_slice(&body);
    message
}

pub fn names(frame: &Frame, sessions: Option<&SessionTable>) -> Vec<&'static str> {
    frame.packets(sessions).map(|n| n.name()).collect()
}

/// Own ranges of the nodes that were not decoded from a reassembled buffer, in order.
pub fn owned_ranges(nodes: &[PacketNode]) -> Vec<ByteRange> {
    let mut owned: Vec<_> = nodes
        .iter()
        .filter(|n| !n.is_reassembled())
        .filter_map(|n| n.own_range())
        .collect();
    owned.sort();
    owned
}

/// Asserts the own ranges of `nodes` cover every byte of `frame` exactly once.
pub fn assert_partition(frame: &Frame, nodes: &[PacketNode]) {
    let mut next = 0;
    for r in owned_ranges(nodes) {
        assert_eq!(r.start(), next, "gap or overlap at {}", next);
        next = r.end() + 1;
    }
    assert_eq!(next, frame.len());
}

fn smb_command(params: &[u8], data: &[u8]) -> Vec<u8> {
    let mut c = vec![(params.len() / 2) as u8];
    c.extend_from_slice(params);
    c.extend_from_slice(&(data.len() as u16).to_le_bytes());
    c.extend_from_slice(data);
    c
}

/// NetBIOS session message holding an SMB1 SESSION_SETUP_ANDX request chained to a
/// TREE_CONNECT_ANDX request. `andx_offset` overrides the offset of the second command.
pub fn smb_session_setup_tree_connect(andx_offset: Option<u16>) -> Vec<u8> {
    let data = b"guest\0DOMAIN\0Unix\0fathom\0";
    let setup_len = 1 + 26 + 2 + data.len();
    let offset = andx_offset.unwrap_or((32 + setup_len) as u16);

    let mut setup = vec![0x75, 0x00];
    setup.extend_from_slice(&offset.to_le_bytes());
    setup.extend_from_slice(&[0xff, 0xff, 0x02, 0x00, 0x00, 0x00, 0, 0, 0, 0]);
    setup.extend_from_slice(&[0; 12]);

    let mut smb = b"\xffSMB\x73".to_vec();
    smb.extend_from_slice(&[0, 0, 0, 0, 0x18, 0x01, 0x00]);
    smb.extend_from_slice(&[0; 12]);
    smb.extend_from_slice(&[0x00, 0x08, 0x34, 0x12, 0x00, 0x08, 0x01, 0x00]);
    smb.extend(smb_command(&setup, data));
    smb.extend(smb_command(
        &[0xff, 0, 0, 0, 0x08, 0x00, 0x01, 0x00],
        b"\0\\\\FILES\\PUBLIC\0A:\0",
    ));

    let mut message = vec![0x00, 0x00];
    message.extend_from_slice(&(smb.len() as u16).to_be_bytes());
    message.extend(smb);
    message
}
