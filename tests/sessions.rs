mod common;

use std::net::Ipv4Addr;
use std::thread;

use common::*;
use fathom::session::{FinderState, IpEndpoints};
use fathom::{
    dissect, AppProtocol, Config, FinderPolicy, Frame, Precedence, SessionKey, SessionTable,
    Timestamp, Transport, ENCAP_TYPE_RAW,
};

fn frame(bytes: Vec<u8>) -> Frame {
    dissect(bytes, Timestamp::default(), ENCAP_TYPE_RAW, false)
}

fn tcp_key(client_port: u16, server_port: u16) -> SessionKey {
    let endpoints = IpEndpoints::new(Ipv4Addr::from(CLIENT), Ipv4Addr::from(SERVER));
    SessionKey::new(Transport::Tcp, &endpoints, client_port, server_port)
}

#[test]
fn confirmed_protocol_is_final() {
    let table = SessionTable::default();
    let key = tcp_key(49152, 8080);

    let request = frame(tcp(
        (CLIENT, 49152),
        (SERVER, 8080),
        b"GET / HTTP/1.1\r\nHost: a\r\n\r\n",
    ));
    assert_eq!(names(&request, Some(&table)), ["IPv4", "TCP", "HTTP"]);
    assert_eq!(table.confirmed_protocol(&key), Some(AppProtocol::Http));

    let response = frame(tcp(
        (SERVER, 8080),
        (CLIENT, 49152),
        b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n",
    ));
    assert_eq!(names(&response, Some(&table)), ["IPv4", "TCP", "HTTP"]);

    // TLS bytes on a session known to carry HTTP are not HTTP, and not TLS either.
    let stray = frame(tcp((CLIENT, 49152), (SERVER, 8080), &tls_record(23, b"xyz")));
    assert_eq!(names(&stray, Some(&table)), ["IPv4", "TCP", "Raw"]);
    assert!(stray.anomalies().is_empty());

    assert_eq!(table.confirmed_protocol(&key), Some(AppProtocol::Http));
    assert_eq!(table.len(), 1);
}

#[test]
fn failed_candidates_leave_the_session_unconfirmed() {
    let table = SessionTable::default();
    let key = tcp_key(49152, 80);

    let bad = frame(tcp((CLIENT, 49152), (SERVER, 80), b"GET /index.html\r\n\r\n"));
    assert_eq!(names(&bad, Some(&table)), ["IPv4", "TCP", "Raw"]);
    assert_eq!(bad.anomalies().len(), 1);
    assert!(matches!(
        table.state(&key),
        Some(FinderState::Unconfirmed { .. })
    ));

    let good = frame(tcp((CLIENT, 49152), (SERVER, 80), b"GET / HTTP/1.0\r\n\r\n"));
    assert_eq!(names(&good, Some(&table)), ["IPv4", "TCP", "HTTP"]);
    assert_eq!(table.confirmed_protocol(&key), Some(AppProtocol::Http));
}

#[test]
fn content_sniffing_finds_tls_on_any_port() {
    let payload = tls_record(22, &client_hello("sniffed.example"));

    let table = SessionTable::default();
    let f = frame(tcp((CLIENT, 49152), (SERVER, 9000), &payload));
    assert_eq!(
        names(&f, Some(&table)),
        ["IPv4", "TCP", "TLS Record", "TLS Handshake"]
    );
    assert_eq!(
        table.confirmed_protocol(&tcp_key(49152, 9000)),
        Some(AppProtocol::Tls)
    );

    let blind = SessionTable::new(FinderPolicy {
        content_sniffing: false,
        ..FinderPolicy::default()
    });
    let f = frame(tcp((CLIENT, 49152), (SERVER, 9000), &payload));
    assert_eq!(names(&f, Some(&blind)), ["IPv4", "TCP", "Raw"]);
    assert!(f.anomalies().is_empty());
}

#[test]
fn content_first_finds_tls_on_an_unregistered_port() {
    let payload = tls_record(22, &client_hello("seven.example"));

    let table = SessionTable::new(FinderPolicy {
        precedence: Precedence::ContentFirst,
        ..FinderPolicy::default()
    });
    let f = frame(tcp((CLIENT, 49152), (SERVER, 7000), &payload));
    let found = names(&f, Some(&table));
    assert!(found.ends_with(&["TLS Record", "TLS Handshake"]), "{:?}", found);
    assert_eq!(
        table.confirmed_protocol(&tcp_key(49152, 7000)),
        Some(AppProtocol::Tls)
    );

    let blind = SessionTable::new(FinderPolicy {
        precedence: Precedence::PortFirst,
        content_sniffing: false,
    });
    let f = frame(tcp((CLIENT, 49152), (SERVER, 7000), &payload));
    assert_eq!(names(&f, Some(&blind)), ["IPv4", "TCP", "Raw"]);
    assert_eq!(blind.confirmed_protocol(&tcp_key(49152, 7000)), None);
}

#[test]
fn tls_on_the_http_port() {
    let payload = tls_record(22, &client_hello("port80.example"));
    for precedence in [Precedence::PortFirst, Precedence::ContentFirst] {
        let table = SessionTable::new(FinderPolicy {
            precedence,
            ..FinderPolicy::default()
        });
        let f = frame(tcp((CLIENT, 49152), (SERVER, 80), &payload));
        assert_eq!(
            names(&f, Some(&table)),
            ["IPv4", "TCP", "TLS Record", "TLS Handshake"]
        );
        assert!(f.anomalies().is_empty());
        assert_eq!(
            table.confirmed_protocol(&tcp_key(49152, 80)),
            Some(AppProtocol::Tls)
        );
    }
}

#[test]
fn hints_add_candidates() {
    let table = SessionTable::new(FinderPolicy {
        content_sniffing: false,
        ..FinderPolicy::default()
    });
    let key = tcp_key(49152, 9000);
    table.hint(&key, AppProtocol::Http);

    let f = frame(tcp((CLIENT, 49152), (SERVER, 9000), b"GET / HTTP/1.1\r\n\r\n"));
    assert_eq!(names(&f, Some(&table)), ["IPv4", "TCP", "HTTP"]);
    assert_eq!(table.confirmed_protocol(&key), Some(AppProtocol::Http));
}

#[test]
fn policy_from_config() {
    let config = Config::from_json(r#"{"finder": {"precedence": "content_first"}}"#).unwrap();
    assert_eq!(config.finder.precedence, Precedence::ContentFirst);
    assert!(config.finder.content_sniffing);
    let table = SessionTable::new(config.finder);
    assert_eq!(table.policy().precedence, Precedence::ContentFirst);
}

fn capture() -> Vec<Vec<u8>> {
    vec![
        tcp((CLIENT, 50000), (SERVER, 443), &tls_record(22, &client_hello("a.example"))),
        tcp((CLIENT, 50001), (SERVER, 80), b"GET /a HTTP/1.1\r\n\r\n"),
        udp((CLIENT, 50002), (SERVER, 5060), b"OPTIONS sip:a@b SIP/2.0\r\nl: 0\r\n\r\n"),
        tcp((SERVER, 443), (CLIENT, 50000), &tls_record(23, b"opaque")),
        tcp((CLIENT, 50003), (SERVER, 7000), b"\x00\x01\x02\x03"),
        tcp((SERVER, 80), (CLIENT, 50001), b"HTTP/1.1 304 Not Modified\r\n\r\n"),
    ]
}

fn run(table: &SessionTable) -> Vec<Vec<&'static str>> {
    capture()
        .into_iter()
        .map(|bytes| names(&frame(bytes), Some(table)))
        .collect()
}

#[test]
fn identification_is_deterministic() {
    let first = SessionTable::default();
    let second = SessionTable::default();
    assert_eq!(run(&first), run(&second));
    assert_eq!(first.len(), 5);
    for (client_port, server_port) in [(50000, 443), (50001, 80), (50003, 7000)] {
        let key = tcp_key(client_port, server_port);
        assert_eq!(first.state(&key), second.state(&key));
    }
    assert_eq!(
        first.confirmed_protocol(&tcp_key(50000, 443)),
        Some(AppProtocol::Tls)
    );
}

#[test]
fn shared_table_across_threads() {
    let table = SessionTable::default();
    thread::scope(|s| {
        for i in 0..8_u16 {
            let table = &table;
            s.spawn(move || {
                let http = tcp((CLIENT, 40000 + i), (SERVER, 8080), b"GET / HTTP/1.1\r\n\r\n");
                let tls = tcp(
                    (CLIENT, 41000 + i),
                    (SERVER, 8443),
                    &tls_record(22, &client_hello("threads.example")),
                );
                for _ in 0..20 {
                    assert_eq!(
                        names(&frame(http.clone()), Some(table)),
                        ["IPv4", "TCP", "HTTP"]
                    );
                    assert_eq!(
                        names(&frame(tls.clone()), Some(table)),
                        ["IPv4", "TCP", "TLS Record", "TLS Handshake"]
                    );
                }
            });
        }
        // Every thread also dissects frames of one common session.
        for _ in 0..8 {
            let table = &table;
            s.spawn(move || {
                let bytes = tcp((CLIENT, 45000), (SERVER, 80), b"HEAD / HTTP/1.1\r\n\r\n");
                for _ in 0..20 {
                    assert_eq!(names(&frame(bytes.clone()), Some(table)).last(), Some(&"HTTP"));
                }
            });
        }
    });

    assert_eq!(table.len(), 17);
    for i in 0..8_u16 {
        assert_eq!(
            table.confirmed_protocol(&tcp_key(40000 + i, 8080)),
            Some(AppProtocol::Http)
        );
        assert_eq!(
            table.confirmed_protocol(&tcp_key(41000 + i, 8443)),
            Some(AppProtocol::Tls)
        );
    }
    assert_eq!(
        table.confirmed_protocol(&tcp_key(45000, 80)),
        Some(AppProtocol::Http)
    );
}
