//! End-to-end exercise of the progress engine and the membership guard:
//! the same sequence of validate → normalize → classify → aggregate the
//! service layer runs, over plain values.

use chrono::{Duration, Utc};
use uuid::Uuid;

use okrserver::membership::{
    ensure_can_delete, Membership, MembershipError, MembershipRole, MembershipStatus,
};
use okrserver::okr::progress::{
    aggregate_progress, compute_progress, key_result_status, objective_status,
    validate_metric_values, KeyResultStatus, MetricType, ObjectiveStatus,
};

fn membership(company: Uuid, role: MembershipRole, status: MembershipStatus) -> Membership {
    let now = Utc::now();
    Membership {
        id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
        company_id: company,
        role,
        status,
        created_at: now,
        updated_at: now,
    }
}

#[test]
fn key_result_lifecycle_from_creation_to_completion() {
    let now = Utc::now();
    let start = now - Duration::days(1);
    let due = now + Duration::days(60);

    // Freshly created: nothing measured yet.
    validate_metric_values(MetricType::Numeric, 0.0, 200.0).unwrap();
    let p = compute_progress(MetricType::Numeric, 0.0, 200.0, 0.0);
    assert_eq!(p.progress, 0.0);
    assert_eq!(
        key_result_status(p.progress, start, due, now),
        KeyResultStatus::Behind
    );

    // Mid-quarter check-in.
    let p = compute_progress(MetricType::Numeric, 120.0, 200.0, p.progress);
    assert_eq!(p.progress, 60.0);
    assert_eq!(
        key_result_status(p.progress, start, due, now),
        KeyResultStatus::OnTrack
    );

    // Target reached.
    let p = compute_progress(MetricType::Numeric, 200.0, 200.0, p.progress);
    assert_eq!(p.progress, 100.0);
    assert_eq!(
        key_result_status(p.progress, start, due, now),
        KeyResultStatus::Completed
    );
}

#[test]
fn objective_roll_up_follows_its_key_results() {
    let now = Utc::now();
    let start = now - Duration::days(10);
    let end = now + Duration::days(80);

    // Three children: one complete, one partial, one untouched.
    let children = [100.0, 50.0, 0.0];
    let progress = aggregate_progress(&children);
    assert_eq!(progress, 50.0);

    let status = objective_status(progress, start, end, now, ObjectiveStatus::Draft);
    assert_eq!(status, ObjectiveStatus::Active);

    // No key results at all: roll-up yields zero and the stored status
    // survives the reclassification untouched.
    let progress = aggregate_progress(&[]);
    assert_eq!(progress, 0.0);
    let status = objective_status(progress, start, end, now, ObjectiveStatus::OnHold);
    assert_eq!(status, ObjectiveStatus::OnHold);
}

#[test]
fn overshooting_key_results_push_the_aggregate_past_hundred() {
    let now = Utc::now();

    validate_metric_values(MetricType::Currency, 260.0, 200.0).unwrap();
    let p = compute_progress(MetricType::Currency, 260.0, 200.0, 0.0);
    assert_eq!(p.progress, 130.0);

    let aggregate = aggregate_progress(&[p.progress, 90.0]);
    assert_eq!(aggregate, 110.0);

    // Past the window with an overshot aggregate: "progress < 100" fails,
    // so the archive arm is skipped and the objective goes active.
    let status = objective_status(
        aggregate,
        now - Duration::days(30),
        now - Duration::days(1),
        now,
        ObjectiveStatus::Draft,
    );
    assert_eq!(status, ObjectiveStatus::Active);
}

#[test]
fn binary_key_result_only_lands_on_zero_or_hundred() {
    validate_metric_values(MetricType::Binary, 0.0, 1.0).unwrap();
    let p = compute_progress(MetricType::Binary, 0.0, 1.0, 0.0);
    assert_eq!(p.progress, 0.0);

    // Flipping the flag completes the key result and pins the target.
    validate_metric_values(MetricType::Binary, 1.0, 1.0).unwrap();
    let p = compute_progress(MetricType::Binary, 1.0, 1.0, p.progress);
    assert_eq!(p.progress, 100.0);
    assert_eq!(p.target_value, 1.0);

    // Half-done binaries never make it past validation.
    assert!(validate_metric_values(MetricType::Binary, 0.5, 1.0).is_err());
}

#[test]
fn rejected_values_never_reach_the_normalizer() {
    assert!(validate_metric_values(MetricType::Percentage, 10.0, 150.0).is_err());
    assert!(validate_metric_values(MetricType::Numeric, -1.0, 100.0).is_err());

    let err = validate_metric_values(MetricType::Percentage, 10.0, 150.0).unwrap_err();
    assert_eq!(err.to_string(), "percentage target must be between 0 and 100");
}

#[test]
fn last_admin_cannot_leave_but_a_covered_admin_can() {
    let company = Uuid::new_v4();
    let solo_admin = membership(company, MembershipRole::Admin, MembershipStatus::Active);
    let member = membership(company, MembershipRole::Member, MembershipStatus::Active);
    let roster = vec![solo_admin.clone(), member.clone()];

    assert!(matches!(
        ensure_can_delete(&solo_admin, &roster),
        Err(MembershipError::LastAdmin)
    ));
    assert!(ensure_can_delete(&member, &roster).is_ok());

    // Promote a second admin; the first may now be deleted.
    let second_admin = membership(company, MembershipRole::Admin, MembershipStatus::Active);
    let roster = vec![solo_admin.clone(), member, second_admin];
    assert!(ensure_can_delete(&solo_admin, &roster).is_ok());
}
