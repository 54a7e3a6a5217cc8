use std::time::Duration;

use runner_protocols::Deferral;

use super::*;

fn execute(raw: &str) -> Command {
    match decode(raw).unwrap().instruction {
        Instruction::Execute(cmd) => cmd,
        other => panic!("expected Execute, got {:?}", other),
    }
}

// ============================================================================
// Decoding
// ============================================================================

#[test]
fn test_decode_click_with_encoded_locator() {
    let cmd = execute("cmd=click&1=id%3Dbtn");
    assert_eq!(cmd, Command::new("click", "id=btn", ""));
}

#[test]
fn test_decode_plus_is_space() {
    let cmd = execute("cmd=type&1=q&2=hello+world");
    assert_eq!(cmd.arg2, "hello world");
}

#[test]
fn test_decode_strips_trailing_whitespace() {
    let cmd = execute("cmd=open&1=%2Fhome  \r\n");
    assert_eq!(cmd, Command::new("open", "/home", ""));
}

#[test]
fn test_decode_missing_args_default_empty() {
    let cmd = execute("cmd=refresh");
    assert_eq!(cmd.arg1, "");
    assert_eq!(cmd.arg2, "");
}

#[test]
fn test_decode_complete_marker() {
    let decoded = decode("|testComplete|||").unwrap();
    assert_eq!(decoded.instruction, Instruction::Complete);
}

#[test]
fn test_decode_retry_last() {
    let decoded = decode("cmd=retryLast").unwrap();
    assert_eq!(decoded.instruction, Instruction::RetryLast);
}

#[test]
fn test_decode_missing_cmd() {
    let err = decode("1=foo&2=bar").unwrap_err();
    assert_eq!(err, ProtocolError::MissingCommand("1=foo&2=bar".to_string()));
}

#[test]
fn test_decode_empty_body() {
    assert_eq!(decode("").unwrap_err(), ProtocolError::EmptyResponse);
    assert_eq!(decode("  \n").unwrap_err(), ProtocolError::EmptyResponse);
}

#[test]
fn test_decode_directives() {
    let raw = "cmd=click&1=link\nseleniumWindowName=main\nsessionId=abc\nbaseUrl=http%3A%2F%2Fhost%2F";
    let decoded = decode(raw).unwrap();
    assert_eq!(
        decoded.directives,
        vec![
            Directive::WindowName("main".to_string()),
            Directive::SessionId("abc".to_string()),
            Directive::Bind {
                key: "baseUrl".to_string(),
                value: "http://host/".to_string(),
            },
        ]
    );
}

#[test]
fn test_decode_malformed_directive_ignored() {
    let decoded = decode("cmd=click&1=a\nnot a directive\n\nk=v").unwrap();
    assert_eq!(decoded.directives.len(), 1);
    assert!(matches!(decoded.instruction, Instruction::Execute(_)));
}

// ============================================================================
// Encoding
// ============================================================================

#[test]
fn test_encode_passed() {
    assert_eq!(encode(&Outcome::Passed).unwrap(), "OK");
    assert_eq!(encode(&Outcome::ValueReturned(None)).unwrap(), "OK");
}

#[test]
fn test_encode_value() {
    let outcome = Outcome::ValueReturned(Some("hello".to_string()));
    assert_eq!(encode(&outcome).unwrap(), "OK,hello");
}

#[test]
fn test_encode_failure_verbatim() {
    let outcome = Outcome::Failed("Element not found".to_string());
    assert_eq!(encode(&outcome).unwrap(), "Element not found");
}

#[test]
fn test_encode_error_prefix() {
    let outcome = Outcome::Errored("boom".to_string());
    assert_eq!(encode(&outcome).unwrap(), "ERROR: boom");
}

#[test]
fn test_encode_flattens_newlines() {
    let outcome = Outcome::ValueReturned(Some("a\r\nb\nc\rd".to_string()));
    assert_eq!(encode(&outcome).unwrap(), "OK,a b c d");
}

#[test]
fn test_encode_unresolved_deferral() {
    let outcome = Outcome::DeferredCompletion(Deferral::condition("true", Duration::from_secs(1)));
    assert_eq!(encode(&outcome).unwrap_err(), CodecError::UnresolvedOutcome);
}

#[test]
fn test_encode_body() {
    assert_eq!(encode_body("START"), "postedData=START");
    assert_eq!(encode_body("OK,a=b&c"), "postedData=OK%2Ca%3Db%26c");
}
