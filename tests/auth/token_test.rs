//! Access token freshness tests.

use chrono::{Duration, Utc};

use courier::auth::AccessToken;

fn token_expiring_in(seconds: i64) -> AccessToken {
    let now = Utc::now();
    AccessToken {
        token: "secret-bearer-value".to_owned(),
        issued_at: now,
        expires_at: now + Duration::seconds(seconds),
    }
}

#[test]
fn fresh_well_before_expiry() {
    let token = token_expiring_in(3600);
    assert!(token.is_fresh());
}

#[test]
fn stale_inside_the_skew_window() {
    let now = Utc::now();
    let token = AccessToken {
        token: "secret-bearer-value".to_owned(),
        issued_at: now,
        expires_at: now + Duration::seconds(120),
    };
    // 60 s before expiry sits exactly on the skew boundary, which is stale.
    let at_margin = now + Duration::seconds(60);
    assert!(!token.is_fresh_at(at_margin));
}

#[test]
fn fresh_just_outside_the_skew_window() {
    let now = Utc::now();
    let token = token_expiring_in(120);
    let just_outside = now + Duration::seconds(58);
    assert!(token.is_fresh_at(just_outside));
}

#[test]
fn already_expired_is_stale() {
    let token = token_expiring_in(-10);
    assert!(!token.is_fresh());
}

#[test]
fn debug_output_redacts_the_token() {
    let token = token_expiring_in(3600);
    let rendered = format!("{token:?}");
    assert!(rendered.contains("[REDACTED]"));
    assert!(!rendered.contains("secret-bearer-value"));
}
