//! Fuzz testing for deployment payload parsing and validation.
//!
//! ```bash
//! cargo +nightly fuzz run fuzz_deployment_payload
//! ```

#![no_main]

use arbitrary::Arbitrary;
use edge_deployment_gateway::models::DeploymentRequest;
use edge_deployment_gateway::validation::validate_deployment_request;
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
enum Input<'a> {
    /// Arbitrary request body
    Body(&'a [u8]),
    /// Structurally valid request with arbitrary field values
    Fields {
        email: String,
        token: String,
        corp_name: String,
        site_name: String,
        fastly_sid: String,
        fastly_key: String,
    },
}

fuzz_target!(|input: Input<'_>| {
    match input {
        Input::Body(body) => {
            if let Ok(request) = serde_json::from_slice::<DeploymentRequest>(body) {
                let _ = validate_deployment_request(&request);
            }
        }
        Input::Fields {
            email,
            token,
            corp_name,
            site_name,
            fastly_sid,
            fastly_key,
        } => {
            let request = DeploymentRequest {
                email,
                token,
                corp_name,
                site_name,
                fastly_sid,
                fastly_key,
            };
            let _ = validate_deployment_request(&request);
            let _ = format!("{request:?}");
        }
    }
});
