//! Minimal SNMP v2c agent for end-to-end tests.
//!
//! Answers GET and GETNEXT requests from a seeded OID table over UDP,
//! speaking just enough BER for the client under test. Scenarios bind one
//! agent per simulated host on distinct loopback addresses (127.0.0.0/8),
//! all sharing one port. Requests with the wrong community are dropped,
//! like an agent with source ACLs.

use std::collections::BTreeMap;
use std::net::{SocketAddr, UdpSocket};
use std::ops::Bound;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

const GET_REQUEST: u8 = 0xa0;
const GET_NEXT_REQUEST: u8 = 0xa1;
const GET_RESPONSE: u8 = 0xa2;
const TAG_SEQUENCE: u8 = 0x30;
const TAG_INTEGER: u8 = 0x02;
const TAG_OCTET_STRING: u8 = 0x04;
const TAG_OID: u8 = 0x06;
const TAG_NO_SUCH_OBJECT: u8 = 0x80;
const TAG_END_OF_MIB_VIEW: u8 = 0x82;

#[derive(Debug, Clone)]
pub enum AgentValue {
    Int(i64),
    Str(String),
    Octets(Vec<u8>),
    Oid(Vec<u32>),
}

#[derive(Debug)]
pub struct MockAgent {
    community: String,
    values: BTreeMap<Vec<u32>, AgentValue>,
}

impl MockAgent {
    pub fn new(community: &str) -> Self {
        Self {
            community: community.to_string(),
            values: BTreeMap::new(),
        }
    }

    pub fn set(mut self, oid: Vec<u32>, value: AgentValue) -> Self {
        self.values.insert(oid, value);
        self
    }

    pub fn extend(mut self, rows: Vec<(Vec<u32>, AgentValue)>) -> Self {
        self.values.extend(rows);
        self
    }

    /// Bind and serve on `addr`; port 0 picks an ephemeral port.
    pub fn serve(self, addr: SocketAddr) -> RunningAgent {
        let socket = UdpSocket::bind(addr).expect("bind mock agent");
        socket
            .set_read_timeout(Some(Duration::from_millis(50)))
            .expect("set read timeout");
        let local = socket.local_addr().expect("local addr");

        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = stop.clone();
        let handle = std::thread::spawn(move || {
            let mut buf = [0u8; 4096];
            while !thread_stop.load(Ordering::SeqCst) {
                match socket.recv_from(&mut buf) {
                    Ok((len, peer)) => {
                        if let Some(response) = self.handle_request(&buf[..len]) {
                            let _ = socket.send_to(&response, peer);
                        }
                    }
                    Err(e)
                        if matches!(
                            e.kind(),
                            std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
                        ) => {}
                    Err(_) => break,
                }
            }
        });

        RunningAgent {
            addr: local,
            stop,
            handle: Some(handle),
        }
    }

    fn handle_request(&self, datagram: &[u8]) -> Option<Vec<u8>> {
        let request = parse_request(datagram)?;
        if request.community != self.community.as_bytes() {
            return None;
        }

        let (oid, value_tlv) = match request.pdu_type {
            GET_REQUEST => match self.values.get(&request.oid) {
                Some(value) => (request.oid.clone(), encode_value(value)),
                None => (request.oid.clone(), vec![TAG_NO_SUCH_OBJECT, 0x00]),
            },
            GET_NEXT_REQUEST => {
                let successor = self
                    .values
                    .range((Bound::Excluded(request.oid.clone()), Bound::Unbounded))
                    .next();
                match successor {
                    Some((oid, value)) => (oid.clone(), encode_value(value)),
                    None => (request.oid.clone(), vec![TAG_END_OF_MIB_VIEW, 0x00]),
                }
            }
            _ => return None,
        };

        Some(build_response(
            &request.community,
            &request.request_id,
            &oid,
            &value_tlv,
        ))
    }
}

pub struct RunningAgent {
    addr: SocketAddr,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl RunningAgent {
    pub fn port(&self) -> u16 {
        self.addr.port()
    }
}

impl Drop for RunningAgent {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

// ==================== BER Parsing ====================

struct ParsedRequest {
    community: Vec<u8>,
    pdu_type: u8,
    /// Raw INTEGER content bytes, echoed back verbatim.
    request_id: Vec<u8>,
    oid: Vec<u32>,
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn byte(&mut self) -> Option<u8> {
        let b = *self.data.get(self.pos)?;
        self.pos += 1;
        Some(b)
    }

    fn length(&mut self) -> Option<usize> {
        let first = self.byte()?;
        if first & 0x80 == 0 {
            return Some(first as usize);
        }
        let count = (first & 0x7f) as usize;
        if count == 0 || count > 2 {
            return None;
        }
        let mut len = 0usize;
        for _ in 0..count {
            len = (len << 8) | self.byte()? as usize;
        }
        Some(len)
    }

    fn tlv(&mut self) -> Option<(u8, &'a [u8])> {
        let tag = self.byte()?;
        let len = self.length()?;
        let start = self.pos;
        let end = start.checked_add(len)?;
        if end > self.data.len() {
            return None;
        }
        self.pos = end;
        Some((tag, &self.data[start..end]))
    }
}

fn parse_request(datagram: &[u8]) -> Option<ParsedRequest> {
    let mut outer = Reader::new(datagram);
    let (tag, message) = outer.tlv()?;
    if tag != TAG_SEQUENCE {
        return None;
    }

    let mut message = Reader::new(message);
    let (tag, _version) = message.tlv()?;
    if tag != TAG_INTEGER {
        return None;
    }
    let (tag, community) = message.tlv()?;
    if tag != TAG_OCTET_STRING {
        return None;
    }
    let (pdu_type, pdu) = message.tlv()?;
    if pdu_type != GET_REQUEST && pdu_type != GET_NEXT_REQUEST {
        return None;
    }

    let mut pdu = Reader::new(pdu);
    let (tag, request_id) = pdu.tlv()?;
    if tag != TAG_INTEGER {
        return None;
    }
    pdu.tlv()?; // error-status
    pdu.tlv()?; // error-index
    let (tag, varbind_list) = pdu.tlv()?;
    if tag != TAG_SEQUENCE {
        return None;
    }

    let mut varbinds = Reader::new(varbind_list);
    let (tag, varbind) = varbinds.tlv()?;
    if tag != TAG_SEQUENCE {
        return None;
    }
    let mut varbind = Reader::new(varbind);
    let (tag, oid_content) = varbind.tlv()?;
    if tag != TAG_OID {
        return None;
    }

    Some(ParsedRequest {
        community: community.to_vec(),
        pdu_type,
        request_id: request_id.to_vec(),
        oid: decode_oid(oid_content)?,
    })
}

fn decode_oid(content: &[u8]) -> Option<Vec<u32>> {
    let mut bytes = content.iter().copied();
    let first = bytes.next()?;
    let mut oid = vec![u32::from(first / 40), u32::from(first % 40)];
    let mut acc: u32 = 0;
    for byte in bytes {
        acc = (acc << 7) | u32::from(byte & 0x7f);
        if byte & 0x80 == 0 {
            oid.push(acc);
            acc = 0;
        }
    }
    Some(oid)
}

// ==================== BER Encoding ====================

fn encode_length(len: usize) -> Vec<u8> {
    if len < 128 {
        vec![len as u8]
    } else if len < 256 {
        vec![0x81, len as u8]
    } else {
        vec![0x82, (len >> 8) as u8, (len & 0xff) as u8]
    }
}

fn tlv(tag: u8, content: &[u8]) -> Vec<u8> {
    let mut out = vec![tag];
    out.extend(encode_length(content.len()));
    out.extend_from_slice(content);
    out
}

fn encode_oid_content(oid: &[u32]) -> Vec<u8> {
    let mut out = Vec::new();
    if oid.len() >= 2 {
        out.push((oid[0] * 40 + oid[1]) as u8);
        for &component in &oid[2..] {
            if component < 128 {
                out.push(component as u8);
            } else {
                let mut bytes = Vec::new();
                let mut value = component;
                while value > 0 {
                    bytes.push((value & 0x7f) as u8);
                    value >>= 7;
                }
                bytes.reverse();
                let last = bytes.len() - 1;
                for (i, b) in bytes.iter().enumerate() {
                    out.push(if i < last { b | 0x80 } else { *b });
                }
            }
        }
    }
    out
}

/// Minimal-length two's complement INTEGER.
fn encode_integer(value: i64) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let mut start = 0;
    while start < 7 {
        let lead = bytes[start];
        let next = bytes[start + 1];
        if (lead == 0x00 && next & 0x80 == 0) || (lead == 0xff && next & 0x80 != 0) {
            start += 1;
        } else {
            break;
        }
    }
    tlv(TAG_INTEGER, &bytes[start..])
}

fn encode_value(value: &AgentValue) -> Vec<u8> {
    match value {
        AgentValue::Int(i) => encode_integer(*i),
        AgentValue::Str(s) => tlv(TAG_OCTET_STRING, s.as_bytes()),
        AgentValue::Octets(b) => tlv(TAG_OCTET_STRING, b),
        AgentValue::Oid(oid) => tlv(TAG_OID, &encode_oid_content(oid)),
    }
}

fn build_response(community: &[u8], request_id: &[u8], oid: &[u32], value_tlv: &[u8]) -> Vec<u8> {
    let mut varbind_content = tlv(TAG_OID, &encode_oid_content(oid));
    varbind_content.extend_from_slice(value_tlv);
    let varbind = tlv(TAG_SEQUENCE, &varbind_content);
    let varbind_list = tlv(TAG_SEQUENCE, &varbind);

    let mut pdu_content = tlv(TAG_INTEGER, request_id);
    pdu_content.extend_from_slice(&[TAG_INTEGER, 0x01, 0x00]); // error-status
    pdu_content.extend_from_slice(&[TAG_INTEGER, 0x01, 0x00]); // error-index
    pdu_content.extend_from_slice(&varbind_list);
    let pdu = tlv(GET_RESPONSE, &pdu_content);

    let mut message = vec![TAG_INTEGER, 0x01, 0x01]; // version: v2c
    message.extend_from_slice(&tlv(TAG_OCTET_STRING, community));
    message.extend_from_slice(&pdu);
    tlv(TAG_SEQUENCE, &message)
}
