//! SNMP client implementation.
//!
//! Each call opens its own v2c session and runs on the blocking pool, so
//! the client can be cloned freely across scan workers. Timeouts are per
//! attempt; a call retries only after a timeout.

use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicI32, Ordering};
use std::time::Duration;

use tokio::task;
use tracing::{debug, warn};

use ::snmp::{SnmpError as WireError, SyncSession, Value};

/// Seed for per-session request ids. Sessions increment internally per
/// request; seeding from a shared counter keeps concurrent in-flight
/// transactions distinct.
static REQUEST_ID: AtomicI32 = AtomicI32::new(1);

/// SNMP call failure kinds.
#[derive(Debug, thiserror::Error)]
pub enum SnmpError {
    #[error("request timed out")]
    Timeout,
    #[error("community rejected by agent")]
    AuthRefused,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("malformed response: {0}")]
    Decode(String),
    #[error("blocking task failed: {0}")]
    Join(String),
}

impl From<WireError> for SnmpError {
    fn from(e: WireError) -> Self {
        match e {
            WireError::ReceiveError => SnmpError::Timeout,
            WireError::SendError => SnmpError::Transport("send failed".into()),
            WireError::CommunityMismatch => SnmpError::AuthRefused,
            other => SnmpError::Decode(format!("{other:?}")),
        }
    }
}

/// An owned SNMP value, decoupled from the session receive buffer.
#[derive(Debug, Clone, PartialEq)]
pub enum SnmpValue {
    Null,
    Boolean(bool),
    Integer(i64),
    OctetString(Vec<u8>),
    ObjectIdentifier(Vec<u32>),
    IpAddress([u8; 4]),
    Counter32(u32),
    Gauge32(u32),
    TimeTicks(u32),
    Opaque(Vec<u8>),
    Counter64(u64),
    NoSuchObject,
    NoSuchInstance,
    EndOfMibView,
}

impl SnmpValue {
    /// Integer-like value, if any.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            SnmpValue::Integer(i) => Some(*i),
            SnmpValue::Counter32(c) => Some(i64::from(*c)),
            SnmpValue::Gauge32(g) => Some(i64::from(*g)),
            SnmpValue::TimeTicks(t) => Some(i64::from(*t)),
            SnmpValue::Counter64(c) => i64::try_from(*c).ok(),
            _ => None,
        }
    }

    /// Raw octets of a string-like value.
    pub fn as_octets(&self) -> Option<&[u8]> {
        match self {
            SnmpValue::OctetString(b) | SnmpValue::Opaque(b) => Some(b),
            _ => None,
        }
    }

    /// Lossless UTF-8 view of a string-like value.
    pub fn as_string(&self) -> Option<String> {
        self.as_octets()
            .and_then(|b| String::from_utf8(b.to_vec()).ok())
    }

    /// OID value, if any.
    pub fn as_oid(&self) -> Option<&[u32]> {
        match self {
            SnmpValue::ObjectIdentifier(oid) => Some(oid),
            _ => None,
        }
    }

    /// Whether the agent actually returned a value for the instance.
    pub fn is_present(&self) -> bool {
        !matches!(
            self,
            SnmpValue::Null
                | SnmpValue::NoSuchObject
                | SnmpValue::NoSuchInstance
                | SnmpValue::EndOfMibView
        )
    }

    /// Display form: octet strings render as text only when every byte is
    /// printable ASCII, otherwise as "0x"-prefixed hex. Never assumes a
    /// string value is printable.
    pub fn printable(&self) -> String {
        match self {
            SnmpValue::OctetString(b) | SnmpValue::Opaque(b) => {
                if b.iter().all(|c| (0x20..=0x7e).contains(c)) {
                    String::from_utf8_lossy(b).into_owned()
                } else {
                    let hex: String = b.iter().map(|c| format!("{c:02x}")).collect();
                    format!("0x{hex}")
                }
            }
            SnmpValue::Integer(i) => i.to_string(),
            SnmpValue::Counter32(c) => c.to_string(),
            SnmpValue::Gauge32(g) => g.to_string(),
            SnmpValue::TimeTicks(t) => t.to_string(),
            SnmpValue::Counter64(c) => c.to_string(),
            SnmpValue::Boolean(b) => b.to_string(),
            SnmpValue::IpAddress(ip) => format!("{}.{}.{}.{}", ip[0], ip[1], ip[2], ip[3]),
            SnmpValue::ObjectIdentifier(oid) => super::oids::oid_to_string(oid),
            SnmpValue::Null
            | SnmpValue::NoSuchObject
            | SnmpValue::NoSuchInstance
            | SnmpValue::EndOfMibView => String::new(),
        }
    }
}

/// Convert a borrowed wire value into an owned one.
fn owned_value(value: &Value) -> SnmpValue {
    match value {
        Value::Boolean(b) => SnmpValue::Boolean(*b),
        Value::Null => SnmpValue::Null,
        Value::Integer(i) => SnmpValue::Integer(*i),
        Value::OctetString(s) => SnmpValue::OctetString(s.to_vec()),
        Value::ObjectIdentifier(oid) => {
            let mut buf = [0u32; 128];
            match oid.read_name(&mut buf) {
                Ok(parts) => SnmpValue::ObjectIdentifier(parts.to_vec()),
                Err(_) => SnmpValue::Null,
            }
        }
        Value::IpAddress(ip) => SnmpValue::IpAddress(*ip),
        Value::Counter32(c) => SnmpValue::Counter32(*c),
        Value::Unsigned32(g) => SnmpValue::Gauge32(*g),
        Value::Timeticks(t) => SnmpValue::TimeTicks(*t),
        Value::Opaque(o) => SnmpValue::Opaque(o.to_vec()),
        Value::Counter64(c) => SnmpValue::Counter64(*c),
        Value::EndOfMibView => SnmpValue::EndOfMibView,
        Value::NoSuchObject => SnmpValue::NoSuchObject,
        Value::NoSuchInstance => SnmpValue::NoSuchInstance,
        other => {
            warn!(value = ?other, "unhandled SNMP value type");
            SnmpValue::Null
        }
    }
}

/// A v2c client bound to one (host, port, community) target.
#[derive(Debug, Clone)]
pub struct SnmpClient {
    target: SocketAddr,
    community: Vec<u8>,
}

impl SnmpClient {
    pub fn new(host: IpAddr, port: u16, community: &str) -> Self {
        Self {
            target: SocketAddr::new(host, port),
            community: community.as_bytes().to_vec(),
        }
    }

    /// GET a single instance.
    pub async fn get(
        &self,
        oid: &[u32],
        timeout: Duration,
        retries: u32,
    ) -> Result<SnmpValue, SnmpError> {
        let values = self.get_many(&[oid.to_vec()], timeout, retries).await?;
        values
            .into_iter()
            .next()
            .ok_or_else(|| SnmpError::Decode("empty varbind list".into()))
    }

    /// GET several instances, preserving request order. The first failing
    /// OID fails the whole call.
    pub async fn get_many(
        &self,
        oids: &[Vec<u32>],
        timeout: Duration,
        retries: u32,
    ) -> Result<Vec<SnmpValue>, SnmpError> {
        let target = self.target;
        let community = self.community.clone();
        let oids = oids.to_vec();

        task::spawn_blocking(move || -> Result<Vec<SnmpValue>, SnmpError> {
            let mut session = open_session(target, &community, timeout)?;
            let mut values = Vec::with_capacity(oids.len());
            for oid in &oids {
                let value = with_retries(retries, || {
                    let pdu = session.get(oid.as_slice()).map_err(SnmpError::from)?;
                    let mut varbinds = pdu.varbinds.into_iter();
                    match varbinds.next() {
                        Some((_, value)) => Ok(owned_value(&value)),
                        None => Err(SnmpError::Decode("response had no varbinds".into())),
                    }
                })?;
                values.push(value);
            }
            Ok(values)
        })
        .await
        .map_err(|e| SnmpError::Join(e.to_string()))?
    }

    /// Walk the subtree under `base` with GETNEXT.
    ///
    /// Stops when the returned OID leaves the subtree (element-wise prefix
    /// compare), on endOfMibView, or on the first non-retryable error; an
    /// error mid-walk yields the rows gathered so far.
    pub async fn walk(
        &self,
        base: &[u32],
        timeout: Duration,
        retries: u32,
    ) -> Result<Vec<(Vec<u32>, SnmpValue)>, SnmpError> {
        let target = self.target;
        let community = self.community.clone();
        let base = base.to_vec();

        task::spawn_blocking(move || -> Result<Vec<(Vec<u32>, SnmpValue)>, SnmpError> {
            let mut session = open_session(target, &community, timeout)?;
            let mut results: Vec<(Vec<u32>, SnmpValue)> = Vec::new();
            let mut current = base.clone();

            loop {
                let step = with_retries(retries, || {
                    let pdu = session.getnext(current.as_slice()).map_err(SnmpError::from)?;
                    let mut varbinds = pdu.varbinds.into_iter();
                    match varbinds.next() {
                        Some((oid, value)) => {
                            let mut buf = [0u32; 128];
                            let name = oid
                                .read_name(&mut buf)
                                .map_err(|e| SnmpError::Decode(format!("{e:?}")))?;
                            Ok(Some((name.to_vec(), owned_value(&value))))
                        }
                        None => Ok(None),
                    }
                });

                match step {
                    Ok(Some((oid, value))) => {
                        if !oid.starts_with(&base) {
                            break;
                        }
                        if matches!(value, SnmpValue::EndOfMibView) {
                            break;
                        }
                        current = oid.clone();
                        results.push((oid, value));
                    }
                    Ok(None) => break,
                    Err(e) if results.is_empty() => return Err(e),
                    Err(e) => {
                        warn!(error = %e, "walk terminated early, keeping partial rows");
                        break;
                    }
                }
            }

            Ok(results)
        })
        .await
        .map_err(|e| SnmpError::Join(e.to_string()))?
    }
}

fn open_session(
    target: SocketAddr,
    community: &[u8],
    timeout: Duration,
) -> Result<SyncSession, SnmpError> {
    let req_id = REQUEST_ID.fetch_add(1, Ordering::Relaxed);
    SyncSession::new(target, community, Some(timeout), req_id)
        .map_err(|e| SnmpError::Transport(e.to_string()))
}

fn with_retries<T>(
    retries: u32,
    mut op: impl FnMut() -> Result<T, SnmpError>,
) -> Result<T, SnmpError> {
    let mut attempt = 0;
    loop {
        match op() {
            Err(SnmpError::Timeout) if attempt < retries => {
                attempt += 1;
                debug!(attempt, "retrying SNMP request after timeout");
            }
            other => return other,
        }
    }
}
