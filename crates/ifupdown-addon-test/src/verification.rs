//! Verification helpers for testing tunnel reconciliation
//!
//! Provides assertion helpers over the calls recorded by [`MockLinkLayer`]

use crate::mock::{LinkCall, MockLinkLayer};
use ifupdown_addon_common::{AttrStatus, CurrentState};
use thiserror::Error;

/// Verification error types
#[derive(Error, Debug)]
pub enum VerificationError {
    #[error("Expected {expected} mutating calls, found {actual}: {calls:?}")]
    MutationCountMismatch {
        expected: usize,
        actual: usize,
        calls: Vec<LinkCall>,
    },

    #[error("Unexpected call at position {index}: expected {expected:?}, got {actual:?}")]
    UnexpectedCall {
        index: usize,
        expected: String,
        actual: LinkCall,
    },

    #[error("Expected link '{name}' to be {expected}")]
    LinkState { name: String, expected: &'static str },

    #[error("Attribute '{attr}' of {iface}: expected {expected:?}, got {actual:?}")]
    StatusMismatch {
        iface: String,
        attr: String,
        expected: AttrStatus,
        actual: Option<AttrStatus>,
    },
}

/// Result type for verification operations
pub type VerifyResult<T> = Result<T, VerificationError>;

fn mutations(mock: &MockLinkLayer) -> Vec<LinkCall> {
    mock.mutating_calls().into_iter().cloned().collect()
}

fn expect_count(mock: &MockLinkLayer, expected: usize) -> VerifyResult<Vec<LinkCall>> {
    let calls = mutations(mock);
    if calls.len() != expected {
        return Err(VerificationError::MutationCountMismatch {
            expected,
            actual: calls.len(),
            calls,
        });
    }
    Ok(calls)
}

/// Verify that no create or delete was issued
pub fn assert_no_mutations(mock: &MockLinkLayer) -> VerifyResult<()> {
    expect_count(mock, 0).map(|_| ())
}

/// Verify a single create of `name` in `mode`, returning its parameters
pub fn assert_single_create(
    mock: &MockLinkLayer,
    name: &str,
    mode: &str,
) -> VerifyResult<Vec<(String, String)>> {
    let calls = expect_count(mock, 1)?;
    match &calls[0] {
        LinkCall::Create {
            name: n,
            mode: m,
            params,
        } if n == name && m == mode => Ok(params.clone()),
        other => Err(VerificationError::UnexpectedCall {
            index: 0,
            expected: format!("create {} mode {}", name, mode),
            actual: other.clone(),
        }),
    }
}

/// Verify a single delete of `name`
pub fn assert_single_delete(mock: &MockLinkLayer, name: &str) -> VerifyResult<()> {
    let calls = expect_count(mock, 1)?;
    match &calls[0] {
        LinkCall::Delete(n) if n == name => Ok(()),
        other => Err(VerificationError::UnexpectedCall {
            index: 0,
            expected: format!("delete {}", name),
            actual: other.clone(),
        }),
    }
}

/// Verify exactly one delete of `name` followed by one create in `mode`
pub fn assert_recreate(mock: &MockLinkLayer, name: &str, mode: &str) -> VerifyResult<()> {
    let calls = expect_count(mock, 2)?;
    match &calls[0] {
        LinkCall::Delete(n) if n == name => {}
        other => {
            return Err(VerificationError::UnexpectedCall {
                index: 0,
                expected: format!("delete {}", name),
                actual: other.clone(),
            })
        }
    }
    match &calls[1] {
        LinkCall::Create { name: n, mode: m, .. } if n == name && m == mode => Ok(()),
        other => Err(VerificationError::UnexpectedCall {
            index: 1,
            expected: format!("create {} mode {}", name, mode),
            actual: other.clone(),
        }),
    }
}

/// Verify whether `name` exists in the mock kernel
pub fn assert_link_present(mock: &MockLinkLayer, name: &str, present: bool) -> VerifyResult<()> {
    if mock.has_link(name) != present {
        return Err(VerificationError::LinkState {
            name: name.to_string(),
            expected: if present { "present" } else { "absent" },
        });
    }
    Ok(())
}

/// Verify the status reported for one attribute
pub fn assert_attr_status(state: &CurrentState, attr: &str, expected: AttrStatus) -> VerifyResult<()> {
    let actual = state.get(attr).map(|c| c.status);
    if actual != Some(expected) {
        return Err(VerificationError::StatusMismatch {
            iface: state.name().to_string(),
            attr: attr.to_string(),
            expected,
            actual,
        });
    }
    Ok(())
}
