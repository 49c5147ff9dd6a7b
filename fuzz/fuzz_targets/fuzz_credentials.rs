//! Fuzz testing for Basic credential parsing.
//!
//! `parse_basic_credential` sees attacker-controlled bytes on every request
//! that carries a known token, so it must never panic and any username it
//! returns must be usable as a header value.
//!
//! ```bash
//! cargo +nightly fuzz run fuzz_credentials -- -max_total_time=60
//! ```

#![no_main]

use edge_deployment_gateway::credentials::encode_basic_token;
use edge_deployment_gateway::middleware::parse_basic_credential;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };

    // Raw token straight from a header
    if let Some(username) = parse_basic_credential(s) {
        assert!(!username.is_empty());
        assert!(!username.chars().any(char::is_control));
    }

    // Round trip through the client-side encoding
    if let Some((user, password)) = s.split_once(':')
        && !user.is_empty()
        && !user.contains(':')
        && !user.chars().any(char::is_control)
    {
        let token = encode_basic_token(user, password);
        assert_eq!(parse_basic_credential(&token).as_deref(), Some(user));
    }
});
