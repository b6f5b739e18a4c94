use std::time::Duration;

use arraymgmt::{
    mask_token, normalize_wwn, verify_port_id, ArrayError, Body, ClientConfig, EndpointIdentity,
    Response,
};
use proptest::prelude::*;
use secrecy::SecretString;

#[test]
fn mask_uuid_token() {
    assert_eq!(
        "********-****-****-****-09847fac48d3",
        mask_token("b74777a3-f9f0-4ea8-bd8f-09847fac48d3", 12)
    );
    assert_eq!(
        "********-****-****-**8f-09847fac48d3",
        mask_token("b74777a3-f9f0-4ea8-bd8f-09847fac48d3", 14)
    );
}

#[test]
fn mask_short_values() {
    assert_eq!("****", mask_token("1234", 0));
    assert_eq!("1234", mask_token("1234", 12));
    assert_eq!("", mask_token("", 12));
    assert_eq!("--", mask_token("--", 1));
}

#[test]
fn port_ids() {
    assert!(verify_port_id("CL1-A").is_ok());
    assert!(verify_port_id("cl3-b").is_ok());
    assert!(verify_port_id("CL5-AB").is_ok());
    assert!(verify_port_id("CL1A").is_err());
    assert!(verify_port_id("CL1-").is_err());
    assert!(verify_port_id("1-A").is_err());
}

#[test]
fn wwns() {
    assert_eq!("100000109b123456", normalize_wwn("10:00:00:10:9B:12:34:56").unwrap());
    assert_eq!("210000e08b054321", normalize_wwn("0x210000E08B054321").unwrap());
    assert_eq!("210000e08b054321", normalize_wwn("21-00-00-e0-8b-05-43-21").unwrap());
    assert!(normalize_wwn("21000").is_err());
    assert!(normalize_wwn("iqn.2017-11.com.example:host").is_err());
}

#[test]
fn endpoint_addresses() {
    let pw = || SecretString::from("pw");
    let id = EndpointIdentity::new("192.0.2.10", "admin", pw()).unwrap();
    assert_eq!("192.0.2.10", id.address());
    assert_eq!(
        "https://192.0.2.10/ConfigurationManager/v1/objects/sessions",
        id.url("/ConfigurationManager/v1/objects/sessions").unwrap().as_str()
    );

    let id = EndpointIdentity::new("https://array.example.com:23451/x", "admin", pw()).unwrap();
    assert_eq!("array.example.com:23451", id.address());
    assert_eq!(
        "https://array.example.com:23451/ConfigurationManager/v1/objects/luns?portId=CL1-A",
        id.url("/ConfigurationManager/v1/objects/luns?portId=CL1-A").unwrap().as_str()
    );

    assert!(EndpointIdentity::new("", "admin", pw()).is_err());
    assert!(EndpointIdentity::new("192.0.2.10", "", pw()).is_err());
}

#[test]
fn endpoint_identity_includes_credentials() {
    let a = EndpointIdentity::new("192.0.2.10", "admin", SecretString::from("pw1")).unwrap();
    let b = EndpointIdentity::new("192.0.2.10", "admin", SecretString::from("pw2")).unwrap();
    assert_ne!(a, b);
    assert_eq!(a, a.clone());
    assert!(!format!("{:?}", a).contains("pw1"));
}

#[test]
fn config_defaults() {
    let cfg = ClientConfig::default();
    assert_eq!(Duration::from_secs(300), cfg.retry.interval);
    assert_eq!(5, cfg.retry.max_retries);
    assert!(!cfg.verify_tls);
    assert_eq!(12, cfg.token_reveal);
}

#[test]
fn config_from_json() {
    let cfg: ClientConfig =
        serde_json::from_str(r#"{"retry_interval": 10, "retry_count": 2, "verify_tls": true}"#)
            .unwrap();
    assert_eq!(Duration::from_secs(10), cfg.retry.interval);
    assert_eq!(2, cfg.retry.max_retries);
    assert!(cfg.verify_tls);
    assert_eq!(Duration::from_secs(30), cfg.timeout);
}

fn arb_token() -> impl Strategy<Value = String> {
    "[0-9a-f-]{0,40}"
}

proptest! {
    #[test]
    fn prop_mask_keeps_separators_and_tail(token in arb_token(), reveal in 0usize..48) {
        let masked = mask_token(&token, reveal);
        let orig: Vec<char> = token.chars().collect();
        let out: Vec<char> = masked.chars().collect();
        prop_assert_eq!(orig.len(), out.len());

        let total = orig.iter().filter(|c| **c != '-').count();
        let shown = reveal.min(total);
        let mut seen = 0;
        for (o, m) in orig.iter().zip(out.iter()) {
            if *o == '-' {
                prop_assert_eq!('-', *m);
                continue;
            }
            seen += 1;
            if seen > total - shown {
                prop_assert_eq!(*o, *m);
            } else {
                prop_assert_eq!('*', *m);
            }
        }
    }
}

#[test]
fn busy_proxy_page_keeps_status() {
    let page = b"<html><body>503 Service Unavailable</body></html>".to_vec();
    let reply = Response::from_parts(503, "application/json", page).unwrap();

    assert_eq!(503, reply.status);
    assert_eq!(
        Body::Text("<html><body>503 Service Unavailable</body></html>".to_string()),
        reply.body
    );
    let err = reply.error_for_status().unwrap_err();
    assert_eq!(Some(503), err.status());
    assert!(format!("{}", err).contains("Service Unavailable"));
}

#[test]
fn malformed_success_body_is_rejected() {
    let err = Response::from_parts(200, "application/json", b"{not json".to_vec()).unwrap_err();
    assert!(matches!(err, ArrayError::TransportSerialization(_)));
}

#[test]
fn error_body_still_decodes_json() {
    let reply =
        Response::from_parts(400, "application/json;charset=UTF-8", br#"{"message":"bad"}"#.to_vec())
            .unwrap();
    assert_eq!(Body::Json(serde_json::json!({"message": "bad"})), reply.body);
}
