//! Integration tests for session lifecycle transitions.

use vision_flow_core::Identity;
use vision_flow_session::{SessionContext, SessionState};

#[test]
fn session_lifecycle_tests_end_session_invalidates_outstanding_stamps() {
    let mut session = SessionContext::new();
    session.establish(Identity::new("Ada", "a@x.com").expect("identity should build"));
    let stamp = session.stamp().expect("stamp should be issued");
    assert!(session.is_current(&stamp));

    session.end_session();
    assert_eq!(session.state(), &SessionState::Ended);
    assert!(!session.is_current(&stamp));
    assert!(session.current_identity().is_anonymous());
}

#[test]
fn session_lifecycle_tests_relogin_as_same_identity_still_rejects_old_stamps() {
    let mut session = SessionContext::new();
    let ada = Identity::new("Ada", "a@x.com").expect("identity should build");
    session.establish(ada.clone());
    let stamp = session.stamp().expect("stamp should be issued");

    session.end_session();
    session.establish(ada);
    assert!(!session.is_current(&stamp));
    assert!(stamp.epoch() < session.epoch());
}

#[test]
fn session_lifecycle_tests_restores_from_stored_record() {
    let session = SessionContext::from_stored(Some(r#"{"first_name":"Ada","email":"a@x.com"}"#))
        .expect("record should decode");
    assert!(session.is_active());
    assert_eq!(session.current_identity().display_name, "Ada");

    let anonymous = SessionContext::from_stored(None).expect("missing record is fine");
    assert!(!anonymous.is_active());
}
