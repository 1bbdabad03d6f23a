#![cfg(feature = "reqwest")]

mod common;

// std
use std::{sync::Arc, time::Duration as StdDuration};
// crates.io
use httpmock::prelude::*;
use serde_json::{Value, json};
// self
use common::*;
use session_broker::{
	error::{Error, RenewalError},
	flows::{RefreshState, SessionClient, TerminationReason},
	http::RequestDescriptor,
	store::{CredentialStore, MemoryStore},
};

#[tokio::test]
async fn concurrent_expiries_share_one_renewal() {
	let server = MockServer::start_async().await;
	let (client, store) = seeded_reqwest_client(&server).await;
	let expired = server
		.mock_async(|when, then| {
			when.method(GET).path("/branches").header("authorization", "Bearer access-1");
			then.status(401).json_body(expired_body());
		})
		.await;
	let renewed = server
		.mock_async(|when, then| {
			when.method(GET).path("/branches").header("authorization", "Bearer access-2");
			then.status(200).json_body(json!([{ "id": 1, "name": "North" }]));
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/auth/refresh")
				.json_body(json!({ "refreshToken": "refresh-1" }));
			then.status(200)
				.json_body(json!({
					"accessToken": "access-2",
					"refreshToken": "refresh-2",
					"user": { "id": "u-1", "name": "Ada Lovelace" }
				}))
				.delay(StdDuration::from_millis(300));
		})
		.await;
	let request = || client.execute_json::<Vec<Value>>(RequestDescriptor::get("/branches"));
	let results = tokio::join!(request(), request(), request(), request(), request());

	for result in [results.0, results.1, results.2, results.3, results.4] {
		let branches = result.expect("Every request should succeed after the shared renewal.");

		assert_eq!(branches[0]["name"], "North");
	}

	refresh.assert_calls_async(1).await;
	expired.assert_calls_async(5).await;
	renewed.assert_calls_async(5).await;

	assert!(matches!(client.coordinator().state(), RefreshState::Idle));
	assert_eq!(client.renewal_metrics.refresh_calls(), 1);
	assert_eq!(client.renewal_metrics.replays(), 5);

	let session = client
		.current_session()
		.await
		.expect("Loading the session should succeed.")
		.expect("The renewed session should be stored.");

	assert_eq!(session.access_credential.expose(), "access-2");
	assert_eq!(session.refresh_credential.expose(), "refresh-2");
	assert_eq!(session.user.get("name"), Some(&json!("Ada Lovelace")));
	assert_eq!(store.len(), 3);
}

#[tokio::test]
async fn rejected_renewal_fails_every_waiter_and_clears_store() {
	let server = MockServer::start_async().await;
	let (client, store) = seeded_reqwest_client(&server).await;
	let log = ObserverLog::default();

	log.attach(&client);

	let expired = server
		.mock_async(|when, then| {
			when.method(GET).path("/sales");
			then.status(401).json_body(expired_body());
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh");
			then.status(401)
				.json_body(json!({ "code": "session_invalid", "message": "Session revoked" }))
				.delay(StdDuration::from_millis(200));
		})
		.await;
	let request = || client.execute(RequestDescriptor::get("sales"));
	let results = tokio::join!(request(), request(), request());

	for result in [results.0, results.1, results.2] {
		match result.expect_err("Every waiter should receive the renewal failure.") {
			Error::RenewalFailed(RenewalError::Rejected { status, reason }) => {
				assert_eq!(status, 401);
				assert_eq!(reason, "Session revoked");
			},
			other => panic!("Unexpected error: {other:?}"),
		}
	}

	refresh.assert_calls_async(1).await;
	expired.assert_calls_async(3).await;

	assert!(store.is_empty());
	assert_eq!(log.reasons(), vec![TerminationReason::RenewalFailed]);
	assert!(!client.coordinator().is_refreshing());
}

#[tokio::test]
async fn missing_refresh_credential_skips_the_network() {
	let server = MockServer::start_async().await;
	let descriptor = descriptor(&server);
	let store = Arc::new(MemoryStore::default());

	store
		.set_many(vec![("accessToken".into(), "access-1".into())])
		.await
		.expect("Seeding a partial session should succeed.");

	let client = SessionClient::new(store.clone(), descriptor);
	let log = ObserverLog::default();

	log.attach(&client);

	let expired = server
		.mock_async(|when, then| {
			when.method(GET).path("/products");
			then.status(401).json_body(expired_body());
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh");
			then.status(200).json_body(json!({ "accessToken": "never" }));
		})
		.await;
	let err = client
		.execute(RequestDescriptor::get("products"))
		.await
		.expect_err("Renewal without a refresh credential should fail.");

	assert!(matches!(err, Error::NoRefreshCredential));
	assert!(err.is_session_terminal());

	refresh.assert_calls_async(0).await;
	expired.assert_calls_async(1).await;

	assert!(store.is_empty());
	assert_eq!(log.reasons(), vec![TerminationReason::NoRefreshCredential]);
}

#[tokio::test]
async fn replay_that_expires_again_is_terminal() {
	let server = MockServer::start_async().await;
	let (client, _store) = seeded_reqwest_client(&server).await;
	let expired = server
		.mock_async(|when, then| {
			when.method(GET).path("/reports");
			then.status(401).json_body(expired_body());
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh");
			then.status(200).json_body(json!({ "accessToken": "access-2" }));
		})
		.await;
	let err = client
		.execute(RequestDescriptor::get("reports"))
		.await
		.expect_err("A second expiry should surface to the caller.");

	match err {
		Error::SessionExpired(failure) => {
			assert_eq!(failure.status, 401);
			assert_eq!(failure.error_code.as_deref(), Some("token_expired"));
		},
		other => panic!("Unexpected error: {other:?}"),
	}

	refresh.assert_calls_async(1).await;
	expired.assert_calls_async(2).await;

	let session = client
		.current_session()
		.await
		.expect("Loading the session should succeed.")
		.expect("The renewed session should remain stored.");

	assert_eq!(session.access_credential.expose(), "access-2");
	assert_eq!(session.refresh_credential.expose(), "refresh-1");
}

#[tokio::test]
async fn invalid_credential_terminates_without_renewal() {
	let server = MockServer::start_async().await;
	let (client, store) = seeded_reqwest_client(&server).await;
	let log = ObserverLog::default();

	log.attach(&client);

	let rejected = server
		.mock_async(|when, then| {
			when.method(GET).path("/branches");
			then.status(401).json_body(json!({ "code": "token_revoked", "message": "Revoked" }));
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh");
			then.status(200).json_body(json!({ "accessToken": "never" }));
		})
		.await;
	let err = client
		.execute(RequestDescriptor::get("branches"))
		.await
		.expect_err("An invalid credential should surface to the caller.");

	assert!(matches!(err, Error::SessionInvalid(ref failure) if failure.status == 401));

	rejected.assert_calls_async(1).await;
	refresh.assert_calls_async(0).await;

	assert!(store.is_empty());
	assert_eq!(log.reasons(), vec![TerminationReason::SessionInvalid]);
}

#[tokio::test]
async fn unrelated_failures_pass_through_untouched() {
	let server = MockServer::start_async().await;
	let (client, store) = seeded_reqwest_client(&server).await;
	let missing = server
		.mock_async(|when, then| {
			when.method(GET).path("/branches/42");
			then.status(404).json_body(json!({ "message": ["Branch not found"] }));
		})
		.await;
	let throttled = server
		.mock_async(|when, then| {
			when.method(POST).path("/sales");
			then.status(503).header("retry-after", "30").body("maintenance");
		})
		.await;
	let err = client
		.execute(RequestDescriptor::get("branches/42"))
		.await
		.expect_err("A 404 should surface to the caller.");

	match err {
		Error::Api(failure) => {
			assert_eq!(failure.status, 404);
			assert_eq!(failure.summary(), "Branch not found");
		},
		other => panic!("Unexpected error: {other:?}"),
	}

	let err = client
		.execute(
			RequestDescriptor::post("sales")
				.json(&json!({ "total": 10 }))
				.expect("Sale body should serialize."),
		)
		.await
		.expect_err("A 503 should surface to the caller.");

	match err {
		Error::Api(failure) => {
			assert_eq!(failure.status, 503);
			assert_eq!(failure.retry_after, Some(time::Duration::seconds(30)));
			assert_eq!(failure.body_preview.as_deref(), Some("maintenance"));
		},
		other => panic!("Unexpected error: {other:?}"),
	}

	missing.assert_calls_async(1).await;
	throttled.assert_calls_async(1).await;

	assert_eq!(store.len(), 3);
	assert_eq!(client.renewal_metrics.attempts(), 0);
}
