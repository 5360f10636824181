//! Raw DNS client: single-record queries against an explicit resolver and AXFR
//! transcripts against an explicit nameserver.

use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::LazyLock;
use std::time::Duration;

use hickory_resolver::proto::op::{Message, MessageType, OpCode, Query, ResponseCode};
use hickory_resolver::proto::rr::{Name, RData, Record, RecordType};
use log::{debug, trace};
use regex::Regex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, UdpSocket};
use tokio::time::timeout;

use crate::error::DnsError;
use crate::types::{DnsQueryType, TransferStatus};

/// Standard DNS port.
pub(crate) const DNS_PORT: u16 = 53;

/// Transcript line emitted when the server answers the AXFR with an error code.
pub(crate) const TRANSFER_FAILED_MARKER: &str = "; Transfer failed.";
/// Transcript line emitted when nothing arrives before the transfer timeout.
pub(crate) const CONNECTION_TIMEOUT_MARKER: &str =
    ";; connection timed out; no servers could be reached";
/// Prefix of the transcript line emitted on socket errors.
pub(crate) const COMMUNICATIONS_ERROR_PREFIX: &str = ";; communications error";

/// Largest UDP response we accept.
const UDP_BUFFER_SIZE: usize = 4096;

/// A resource-record line of a transfer transcript: `name TTL IN TYPE rdata`.
#[allow(clippy::expect_used)]
static RECORD_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\S+\s+\d+\s+IN\s+\w+\s+").expect("record line pattern is valid")
});

impl DnsQueryType {
    pub(crate) fn record_type(self) -> RecordType {
        match self {
            Self::A => RecordType::A,
            Self::Aaaa => RecordType::AAAA,
            Self::Mx => RecordType::MX,
            Self::Txt => RecordType::TXT,
            Self::Ns => RecordType::NS,
            Self::Cname => RecordType::CNAME,
            Self::Soa => RecordType::SOA,
        }
    }
}

/// DNS client bound to one exchange timeout.
#[derive(Debug, Clone, Copy)]
pub(crate) struct DnsClient {
    timeout: Duration,
}

impl DnsClient {
    pub(crate) fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Query one record type at `resolver` on port 53.
    pub(crate) async fn query_record(
        &self,
        resolver: IpAddr,
        domain: &str,
        record_type: DnsQueryType,
    ) -> Result<Vec<String>, DnsError> {
        self.query_at(SocketAddr::new(resolver, DNS_PORT), domain, record_type)
            .await
    }

    /// Query one record type at an explicit socket address.
    ///
    /// Sent over UDP and retried over TCP when the answer is truncated. The result is
    /// decided from the response code: an empty NOERROR answer is [`DnsError::NoData`].
    pub(crate) async fn query_at(
        &self,
        server: SocketAddr,
        domain: &str,
        record_type: DnsQueryType,
    ) -> Result<Vec<String>, DnsError> {
        let name = parse_name(domain)?;
        let (id, request) = build_query(&name, record_type.record_type(), true)?;

        trace!("[DNS] {record_type} {domain} @{server}");
        let exchange = async {
            let response = exchange_udp(server, &request, id).await?;
            if response.truncated() {
                trace!("[DNS] Truncated answer from {server}, retrying over TCP");
                exchange_tcp(server, &request, id).await
            } else {
                Ok(response)
            }
        };
        let response = timeout(self.timeout, exchange)
            .await
            .map_err(|_| DnsError::Timeout)??;

        let records = answer_strings(&response, record_type.record_type())?;
        debug!(
            "[DNS] {record_type} {domain} @{server}: {} record(s)",
            records.len()
        );
        Ok(records)
    }

    /// AXFR `zone` from `nameserver` on port 53 and render a transcript.
    pub(crate) async fn zone_transfer(&self, zone: &str, nameserver: IpAddr) -> String {
        self.zone_transfer_at(zone, SocketAddr::new(nameserver, DNS_PORT))
            .await
    }

    /// AXFR `zone` from an explicit socket address and render a dig-style transcript.
    ///
    /// Never fails: transport problems are written into the transcript as the
    /// markers [`classify_transfer`] understands. Records received before a timeout
    /// stay in the transcript without the timeout marker.
    pub(crate) async fn zone_transfer_at(&self, zone: &str, server: SocketAddr) -> String {
        let mut transcript = Transcript::new(zone, server);

        let result = timeout(self.timeout, stream_axfr(zone, server, &mut transcript)).await;
        match result {
            Ok(Ok(())) => transcript.finish(),
            Ok(Err(AxfrError::Refused(code))) => {
                debug!("[AXFR] {server} refused transfer of {zone}: {code}");
                transcript.push(TRANSFER_FAILED_MARKER.to_string());
            }
            Ok(Err(AxfrError::Io(e))) => {
                debug!("[AXFR] Communications error with {server}: {e}");
                transcript.push(format!("{COMMUNICATIONS_ERROR_PREFIX} to {server}: {e}"));
            }
            Err(_) if transcript.records == 0 => {
                debug!("[AXFR] {server} timed out for {zone}");
                transcript.push(CONNECTION_TIMEOUT_MARKER.to_string());
            }
            Err(_) => {
                debug!(
                    "[AXFR] {server} timed out for {zone} after {} record(s)",
                    transcript.records
                );
                transcript.push(format!(
                    ";; transfer incomplete: {} records received",
                    transcript.records
                ));
            }
        }

        transcript.lines.join("\n")
    }
}

/// Classification of one transfer transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TransferClassification {
    pub status: TransferStatus,
    /// Number of record lines in the transcript.
    pub record_count: usize,
    /// First `sample_limit` record lines.
    pub sample: Vec<String>,
}

/// Classify an AXFR transcript.
///
/// A failure or timeout marker wins. Otherwise only `name TTL IN TYPE rdata` lines
/// count: at least one means the zone was exposed, none means the server kept it to
/// itself regardless of whatever else it printed.
pub(crate) fn classify_transfer(transcript: &str, sample_limit: usize) -> TransferClassification {
    if transcript.contains("Transfer failed") {
        return TransferClassification {
            status: TransferStatus::Refused,
            record_count: 0,
            sample: vec![],
        };
    }
    if transcript.contains("connection timed out") {
        return TransferClassification {
            status: TransferStatus::Timeout,
            record_count: 0,
            sample: vec![],
        };
    }

    let records: Vec<&str> = transcript
        .lines()
        .filter(|line| !line.trim().is_empty() && !line.starts_with(';'))
        .filter(|line| RECORD_LINE.is_match(line))
        .collect();

    if records.is_empty() {
        return TransferClassification {
            status: TransferStatus::Refused,
            record_count: 0,
            sample: vec![],
        };
    }

    TransferClassification {
        status: TransferStatus::Vulnerable,
        record_count: records.len(),
        sample: records
            .iter()
            .take(sample_limit)
            .map(ToString::to_string)
            .collect(),
    }
}

/// The communications-error line of a transcript, if the transport failed.
pub(crate) fn transport_error(transcript: &str) -> Option<String> {
    transcript
        .lines()
        .find(|line| line.starts_with(COMMUNICATIONS_ERROR_PREFIX))
        .map(|line| line.trim_start_matches(';').trim().to_string())
}

// ==================== Transcript ====================

struct Transcript {
    lines: Vec<String>,
    records: usize,
    messages: usize,
    bytes: usize,
}

impl Transcript {
    fn new(zone: &str, server: SocketAddr) -> Self {
        Self {
            lines: vec![
                format!("; <<>> netprobe <<>> @{} {zone} AXFR", server.ip()),
                ";; global options: +cmd".to_string(),
            ],
            records: 0,
            messages: 0,
            bytes: 0,
        }
    }

    fn push(&mut self, line: String) {
        self.lines.push(line);
    }

    fn push_record(&mut self, record: &Record) {
        self.records += 1;
        self.lines.push(format!(
            "{}\t{}\t{}\t{}\t{}",
            record.name(),
            record.ttl(),
            record.dns_class(),
            record.record_type(),
            record.data()
        ));
    }

    fn finish(&mut self) {
        let summary = format!(
            ";; XFR size: {} records (messages {}, bytes {})",
            self.records, self.messages, self.bytes
        );
        self.lines.push(summary);
    }
}

enum AxfrError {
    Refused(ResponseCode),
    Io(io::Error),
}

impl From<io::Error> for AxfrError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

/// Stream an AXFR over TCP until the closing SOA or EOF.
async fn stream_axfr(
    zone: &str,
    server: SocketAddr,
    transcript: &mut Transcript,
) -> Result<(), AxfrError> {
    let name = parse_name(zone)
        .map_err(|e| AxfrError::Io(io::Error::new(io::ErrorKind::InvalidInput, e.to_string())))?;
    let (id, request) = build_query(&name, RecordType::AXFR, false)
        .map_err(|e| AxfrError::Io(io::Error::other(e.to_string())))?;

    let mut stream = TcpStream::connect(server).await?;
    write_framed(&mut stream, &request).await?;

    let mut soa_seen = 0usize;
    while let Some(payload) = read_framed(&mut stream).await? {
        let message = Message::from_vec(&payload)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
        if message.id() != id {
            trace!("[AXFR] Ignoring message with foreign id {}", message.id());
            continue;
        }
        transcript.messages += 1;
        transcript.bytes += payload.len();

        let code = message.response_code();
        if code != ResponseCode::NoError {
            return Err(AxfrError::Refused(code));
        }
        if transcript.messages == 1 && message.answers().is_empty() {
            return Err(AxfrError::Refused(code));
        }

        for record in message.answers() {
            transcript.push_record(record);
            if record.record_type() == RecordType::SOA {
                soa_seen += 1;
            }
        }
        if soa_seen >= 2 {
            break;
        }
    }

    Ok(())
}

// ==================== Wire helpers ====================

fn parse_name(domain: &str) -> Result<Name, DnsError> {
    let mut name =
        Name::from_ascii(domain).map_err(|e| DnsError::InvalidName(format!("{domain}: {e}")))?;
    name.set_fqdn(true);
    Ok(name)
}

fn build_query(
    name: &Name,
    record_type: RecordType,
    recursion_desired: bool,
) -> Result<(u16, Vec<u8>), DnsError> {
    let id: u16 = rand::random();
    let mut message = Message::new();
    message
        .set_id(id)
        .set_message_type(MessageType::Query)
        .set_op_code(OpCode::Query)
        .set_recursion_desired(recursion_desired)
        .add_query(Query::query(name.clone(), record_type));
    let bytes = message
        .to_vec()
        .map_err(|e| DnsError::Protocol(e.to_string()))?;
    Ok((id, bytes))
}

async fn exchange_udp(server: SocketAddr, request: &[u8], id: u16) -> Result<Message, DnsError> {
    let bind: SocketAddr = if server.is_ipv4() {
        (Ipv4Addr::UNSPECIFIED, 0).into()
    } else {
        (Ipv6Addr::UNSPECIFIED, 0).into()
    };
    let socket = UdpSocket::bind(bind).await?;
    socket.connect(server).await?;
    socket.send(request).await?;

    let mut buf = vec![0u8; UDP_BUFFER_SIZE];
    loop {
        let len = socket.recv(&mut buf).await?;
        match Message::from_vec(&buf[..len]) {
            Ok(message) if message.id() == id => return Ok(message),
            Ok(message) => trace!("[DNS] Ignoring response with foreign id {}", message.id()),
            Err(e) => trace!("[DNS] Ignoring malformed response from {server}: {e}"),
        }
    }
}

async fn exchange_tcp(server: SocketAddr, request: &[u8], id: u16) -> Result<Message, DnsError> {
    let mut stream = TcpStream::connect(server).await?;
    write_framed(&mut stream, request).await?;
    while let Some(payload) = read_framed(&mut stream).await? {
        let message =
            Message::from_vec(&payload).map_err(|e| DnsError::Protocol(e.to_string()))?;
        if message.id() == id {
            return Ok(message);
        }
    }
    Err(DnsError::Protocol(
        "connection closed before a response arrived".to_string(),
    ))
}

/// Write one message with the 2-byte length prefix used by DNS over TCP.
async fn write_framed(stream: &mut TcpStream, payload: &[u8]) -> io::Result<()> {
    let len = u16::try_from(payload.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "DNS message too large"))?;
    stream.write_all(&len.to_be_bytes()).await?;
    stream.write_all(payload).await?;
    stream.flush().await
}

/// Read one length-prefixed message; `None` on a clean EOF.
async fn read_framed(stream: &mut TcpStream) -> io::Result<Option<Vec<u8>>> {
    let len = match stream.read_u16().await {
        Ok(len) => len,
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    };
    let mut payload = vec![0u8; usize::from(len)];
    stream.read_exact(&mut payload).await?;
    Ok(Some(payload))
}

/// Map a response to the normalised answer strings of `record_type`.
fn answer_strings(response: &Message, record_type: RecordType) -> Result<Vec<String>, DnsError> {
    match response.response_code() {
        ResponseCode::NoError => {}
        ResponseCode::NXDomain => return Err(DnsError::DomainNotFound),
        ResponseCode::ServFail => return Err(DnsError::ServerFailure),
        ResponseCode::Refused => return Err(DnsError::QueryRefused),
        other => {
            return Err(DnsError::Protocol(format!(
                "unexpected response code {other}"
            )));
        }
    }

    let records: Vec<String> = response
        .answers()
        .iter()
        .filter(|r| r.record_type() == record_type)
        .filter_map(|r| format_rdata(r.data()))
        .collect();

    if records.is_empty() {
        return Err(DnsError::NoData);
    }
    Ok(records)
}

fn trim_name(name: &Name) -> String {
    name.to_string().trim_end_matches('.').to_string()
}

fn format_rdata(data: &RData) -> Option<String> {
    let value = match data {
        RData::A(a) => a.to_string(),
        RData::AAAA(aaaa) => aaaa.to_string(),
        RData::NS(ns) => trim_name(&ns.0),
        RData::CNAME(cname) => trim_name(&cname.0),
        RData::MX(mx) => format!("{} {}", mx.preference(), trim_name(mx.exchange())),
        RData::TXT(txt) => txt
            .txt_data()
            .iter()
            .map(|part| String::from_utf8_lossy(part).into_owned())
            .collect::<Vec<_>>()
            .join(" "),
        RData::SOA(soa) => format!(
            "{} {} {} {} {} {} {}",
            trim_name(soa.mname()),
            trim_name(soa.rname()),
            soa.serial(),
            soa.refresh(),
            soa.retry(),
            soa.expire(),
            soa.minimum()
        ),
        _ => return None,
    };
    Some(value)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use hickory_resolver::proto::rr::rdata::{A, MX, NS, SOA, TXT};
    use tokio::net::TcpListener;

    use super::*;

    pub(crate) fn name(s: &str) -> Name {
        Name::from_ascii(s).unwrap()
    }

    pub(crate) fn a_record(owner: &str, ip: [u8; 4]) -> Record {
        Record::from_rdata(name(owner), 300, RData::A(A::new(ip[0], ip[1], ip[2], ip[3])))
    }

    pub(crate) fn txt_record(owner: &str, text: &str) -> Record {
        Record::from_rdata(name(owner), 300, RData::TXT(TXT::new(vec![text.to_string()])))
    }

    fn soa_record(owner: &str) -> Record {
        Record::from_rdata(
            name(owner),
            3600,
            RData::SOA(SOA::new(
                name("ns1.example.test."),
                name("hostmaster.example.test."),
                2024_01_01,
                7200,
                3600,
                1_209_600,
                300,
            )),
        )
    }

    /// Build a response to `query` with the given code and answers.
    pub(crate) fn respond(query: &Message, code: ResponseCode, answers: Vec<Record>) -> Vec<u8> {
        let mut response = Message::new();
        response
            .set_id(query.id())
            .set_message_type(MessageType::Response)
            .set_op_code(OpCode::Query)
            .set_response_code(code)
            .add_queries(query.queries().to_vec())
            .add_answers(answers);
        response.to_vec().unwrap()
    }

    /// Loopback UDP server answering every query through `handler`.
    pub(crate) async fn spawn_udp_server<F>(handler: F) -> SocketAddr
    where
        F: Fn(&Message) -> Vec<u8> + Send + 'static,
    {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = socket.local_addr().unwrap();
        tokio::spawn(async move {
            let mut buf = vec![0u8; 4096];
            while let Ok((len, peer)) = socket.recv_from(&mut buf).await {
                let Ok(query) = Message::from_vec(&buf[..len]) else {
                    continue;
                };
                let _ = socket.send_to(&handler(&query), peer).await;
            }
        });
        addr
    }

    /// Loopback TCP server answering one connection with the framed `handler` output.
    async fn spawn_tcp_server<F>(handler: F) -> SocketAddr
    where
        F: Fn(&Message) -> Vec<Vec<u8>> + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                let Ok(Some(payload)) = read_framed(&mut stream).await else {
                    continue;
                };
                let Ok(query) = Message::from_vec(&payload) else {
                    continue;
                };
                for message in handler(&query) {
                    let _ = write_framed(&mut stream, &message).await;
                }
            }
        });
        addr
    }

    fn client() -> DnsClient {
        DnsClient::new(Duration::from_secs(2))
    }

    // ==================== query_at tests ====================

    #[tokio::test]
    async fn test_query_a_records() {
        let addr = spawn_udp_server(|q| {
            respond(
                q,
                ResponseCode::NoError,
                vec![
                    a_record("example.test.", [192, 0, 2, 1]),
                    a_record("example.test.", [192, 0, 2, 2]),
                ],
            )
        })
        .await;
        let records = client()
            .query_at(addr, "example.test", DnsQueryType::A)
            .await
            .unwrap();
        assert_eq!(records, vec!["192.0.2.1", "192.0.2.2"]);
    }

    #[tokio::test]
    async fn test_query_normalises_mx_txt_ns_soa() {
        let addr = spawn_udp_server(|q| {
            let answer = match q.queries()[0].query_type() {
                RecordType::MX => Record::from_rdata(
                    name("example.test."),
                    300,
                    RData::MX(MX::new(10, name("mail.example.test."))),
                ),
                RecordType::TXT => Record::from_rdata(
                    name("example.test."),
                    300,
                    RData::TXT(TXT::new(vec!["v=spf1".to_string(), "-all".to_string()])),
                ),
                RecordType::NS => Record::from_rdata(
                    name("example.test."),
                    300,
                    RData::NS(NS(name("ns1.example.test."))),
                ),
                _ => soa_record("example.test."),
            };
            respond(q, ResponseCode::NoError, vec![answer])
        })
        .await;

        let c = client();
        let mx = c.query_at(addr, "example.test", DnsQueryType::Mx).await.unwrap();
        assert_eq!(mx, vec!["10 mail.example.test"]);
        let txt = c.query_at(addr, "example.test", DnsQueryType::Txt).await.unwrap();
        assert_eq!(txt, vec!["v=spf1 -all"]);
        let ns = c.query_at(addr, "example.test", DnsQueryType::Ns).await.unwrap();
        assert_eq!(ns, vec!["ns1.example.test"]);
        let soa = c.query_at(addr, "example.test", DnsQueryType::Soa).await.unwrap();
        assert_eq!(
            soa,
            vec!["ns1.example.test hostmaster.example.test 20240101 7200 3600 1209600 300"]
        );
    }

    #[tokio::test]
    async fn test_query_maps_response_codes() {
        let nx = spawn_udp_server(|q| respond(q, ResponseCode::NXDomain, vec![])).await;
        let refused = spawn_udp_server(|q| respond(q, ResponseCode::Refused, vec![])).await;
        let servfail = spawn_udp_server(|q| respond(q, ResponseCode::ServFail, vec![])).await;
        let empty = spawn_udp_server(|q| respond(q, ResponseCode::NoError, vec![])).await;

        let c = client();
        assert_eq!(
            c.query_at(nx, "example.test", DnsQueryType::A).await,
            Err(DnsError::DomainNotFound)
        );
        assert_eq!(
            c.query_at(refused, "example.test", DnsQueryType::A).await,
            Err(DnsError::QueryRefused)
        );
        assert_eq!(
            c.query_at(servfail, "example.test", DnsQueryType::A).await,
            Err(DnsError::ServerFailure)
        );
        assert_eq!(
            c.query_at(empty, "example.test", DnsQueryType::A).await,
            Err(DnsError::NoData)
        );
    }

    #[tokio::test]
    async fn test_query_ignores_answers_of_other_types() {
        let addr = spawn_udp_server(|q| {
            respond(
                q,
                ResponseCode::NoError,
                vec![a_record("example.test.", [192, 0, 2, 1])],
            )
        })
        .await;
        assert_eq!(
            client().query_at(addr, "example.test", DnsQueryType::Mx).await,
            Err(DnsError::NoData)
        );
    }

    #[tokio::test]
    async fn test_query_times_out_on_silent_server() {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = socket.local_addr().unwrap();
        let c = DnsClient::new(Duration::from_millis(200));
        assert_eq!(
            c.query_at(addr, "example.test", DnsQueryType::A).await,
            Err(DnsError::Timeout)
        );
        drop(socket);
    }

    #[tokio::test]
    async fn test_query_rejects_invalid_name() {
        let addr: SocketAddr = "127.0.0.1:9".parse().unwrap();
        let long_label = format!("{}.test", "a".repeat(64));
        let result = client().query_at(addr, &long_label, DnsQueryType::A).await;
        assert!(matches!(result, Err(DnsError::InvalidName(_))));
    }

    // ==================== zone transfer tests ====================

    #[tokio::test]
    async fn test_zone_transfer_open_server() {
        let addr = spawn_tcp_server(|q| {
            vec![
                respond(
                    q,
                    ResponseCode::NoError,
                    vec![
                        soa_record("example.test."),
                        a_record("www.example.test.", [192, 0, 2, 10]),
                    ],
                ),
                respond(
                    q,
                    ResponseCode::NoError,
                    vec![
                        a_record("mail.example.test.", [192, 0, 2, 20]),
                        soa_record("example.test."),
                    ],
                ),
            ]
        })
        .await;

        let transcript = client().zone_transfer_at("example.test", addr).await;
        let classification = classify_transfer(&transcript, 50);
        assert_eq!(classification.status, TransferStatus::Vulnerable);
        assert_eq!(classification.record_count, 4);
        assert!(transcript.contains(";; XFR size: 4 records"));
        assert!(transport_error(&transcript).is_none());
    }

    #[tokio::test]
    async fn test_zone_transfer_refused() {
        let addr =
            spawn_tcp_server(|q| vec![respond(q, ResponseCode::Refused, vec![])]).await;
        let transcript = client().zone_transfer_at("example.test", addr).await;
        assert!(transcript.contains(TRANSFER_FAILED_MARKER));
        assert_eq!(
            classify_transfer(&transcript, 50).status,
            TransferStatus::Refused
        );
    }

    #[tokio::test]
    async fn test_zone_transfer_silent_server_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let c = DnsClient::new(Duration::from_millis(200));
        let transcript = c.zone_transfer_at("example.test", addr).await;
        assert!(transcript.contains(CONNECTION_TIMEOUT_MARKER));
        assert_eq!(
            classify_transfer(&transcript, 50).status,
            TransferStatus::Timeout
        );
        drop(listener);
    }

    #[tokio::test]
    async fn test_zone_transfer_connection_refused_is_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let transcript = client().zone_transfer_at("example.test", addr).await;
        assert!(transport_error(&transcript).is_some());
        assert_eq!(
            classify_transfer(&transcript, 50).status,
            TransferStatus::Refused
        );
    }

    // ==================== classify_transfer tests ====================

    #[test]
    fn test_classify_transfer_failed_marker() {
        let text = "; <<>> DiG <<>> @ns1 example.com AXFR\n; Transfer failed.";
        let c = classify_transfer(text, 50);
        assert_eq!(c.status, TransferStatus::Refused);
        assert_eq!(c.record_count, 0);
    }

    #[test]
    fn test_classify_transfer_timeout_marker() {
        let text = ";; connection timed out; no servers could be reached";
        assert_eq!(classify_transfer(text, 50).status, TransferStatus::Timeout);
    }

    #[test]
    fn test_classify_transfer_no_record_lines_is_secure() {
        let text = "; <<>> DiG <<>>\n;; global options: +cmd\n\nsome unrelated output\n";
        let c = classify_transfer(text, 50);
        assert_eq!(c.status, TransferStatus::Refused);
        assert!(c.sample.is_empty());
    }

    #[test]
    fn test_classify_transfer_counts_all_and_samples_first() {
        let mut text = String::from("; <<>> DiG <<>>\n");
        for i in 0..75 {
            text.push_str(&format!("host{i}.example.com. 300 IN A 192.0.2.{i}\n"));
        }
        text.push_str(";; XFR size: 75 records\n");
        let c = classify_transfer(&text, 50);
        assert_eq!(c.status, TransferStatus::Vulnerable);
        assert_eq!(c.record_count, 75);
        assert_eq!(c.sample.len(), 50);
        assert!(c.sample[0].starts_with("host0."));
    }

    #[test]
    fn test_classify_transfer_requires_class_in() {
        let text = "example.com. 300 CH TXT \"version\"\n";
        assert_eq!(classify_transfer(text, 50).status, TransferStatus::Refused);
    }
}
