//! Integration tests for access checks.

mod common;

use chanlink::services::AccessDecision;
use common::{OWNER_ID, TestProbe, test_gate};

#[tokio::test]
async fn test_user_joins_enforced_channels() {
    let gate = test_gate().await;
    let probe = TestProbe::default();

    gate.add_fsub_channel("-100").await.unwrap();
    gate.add_fsub_channel("-200").await.unwrap();
    gate.set_mode_all("on").await.unwrap();

    assert_eq!(
        gate.check_access(5, &probe).await,
        AccessDecision::MustJoin(vec![-100, -200])
    );

    probe.join(-100, 5);
    assert_eq!(
        gate.check_access(5, &probe).await,
        AccessDecision::MustJoin(vec![-200])
    );

    gate.record_join_request(-200, 5).await;
    assert!(gate.check_access(5, &probe).await.is_cleared());

    // Leaving an enforced channel brings the gate back.
    probe.leave(-100, 5);
    assert_eq!(
        gate.check_access(5, &probe).await,
        AccessDecision::MustJoin(vec![-100])
    );
}

#[tokio::test]
async fn test_mode_off_channels_are_not_enforced() {
    let gate = test_gate().await;
    let probe = TestProbe::default();

    gate.add_fsub_channel("-100").await.unwrap();
    gate.add_fsub_channel("-200").await.unwrap();
    gate.set_mode(-200, "on").await.unwrap();

    assert_eq!(
        gate.check_access(5, &probe).await,
        AccessDecision::MustJoin(vec![-200])
    );

    gate.set_mode_all("off").await.unwrap();
    assert!(gate.check_access(5, &probe).await.is_cleared());
}

#[tokio::test]
async fn test_removed_channel_is_not_enforced() {
    let gate = test_gate().await;
    let probe = TestProbe::default();

    gate.add_fsub_channel("-100").await.unwrap();
    gate.set_mode_all("on").await.unwrap();
    assert!(!gate.check_access(5, &probe).await.is_cleared());

    assert!(gate.remove_fsub_channel(-100).await);
    assert!(gate.check_access(5, &probe).await.is_cleared());
}

#[tokio::test]
async fn test_probe_failure_keeps_gate_closed() {
    let gate = test_gate().await;
    let probe = TestProbe::default();

    gate.add_fsub_channel("-100").await.unwrap();
    gate.set_mode_all("on").await.unwrap();
    probe.join(-100, 5);
    probe.break_channel(-100);

    assert_eq!(
        gate.check_access(5, &probe).await,
        AccessDecision::MustJoin(vec![-100])
    );

    // A pending request still satisfies the channel without probing.
    gate.record_join_request(-100, 5).await;
    assert!(gate.check_access(5, &probe).await.is_cleared());
}

#[tokio::test]
async fn test_owner_and_admins() {
    let gate = test_gate().await;
    let probe = TestProbe::default();

    gate.add_fsub_channel("-100").await.unwrap();
    gate.set_mode_all("on").await.unwrap();

    assert!(gate.is_admin(OWNER_ID).await);
    assert!(gate.check_access(OWNER_ID, &probe).await.is_cleared());

    assert!(!gate.is_admin(7).await);
    gate.db().admins().add_admin(7).await.unwrap();
    assert!(gate.is_admin(7).await);
    assert!(gate.check_access(7, &probe).await.is_cleared());

    gate.db().admins().remove_admin(7).await.unwrap();
    assert!(!gate.check_access(7, &probe).await.is_cleared());
}

#[tokio::test]
async fn test_ban_and_unban() {
    let gate = test_gate().await;
    let probe = TestProbe::default();

    gate.db().bans().ban_user(9, 30, "spam").await.unwrap();
    let decision = gate.check_access(9, &probe).await;
    assert_eq!(
        decision,
        AccessDecision::Banned {
            reason: "spam".into()
        }
    );
    assert_eq!(decision.label(), "banned");

    gate.db().bans().unban_user(9).await.unwrap();
    assert!(gate.check_access(9, &probe).await.is_cleared());
}

#[tokio::test]
async fn test_store_outage_fails_open() {
    let gate = test_gate().await;
    let probe = TestProbe::default();

    gate.add_fsub_channel("-100").await.unwrap();
    gate.set_mode_all("on").await.unwrap();
    assert!(!gate.check_access(5, &probe).await.is_cleared());

    gate.db().close().await;
    assert!(gate.check_access(5, &probe).await.is_cleared());
    assert!(!gate.is_admin(5).await);
    assert!(gate.is_admin(OWNER_ID).await);
}
