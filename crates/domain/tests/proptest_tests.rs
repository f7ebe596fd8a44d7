//! Property-based tests for domain value objects
//!
//! These tests use proptest to verify invariants across many random inputs.

use domain::{
    BranchCode, Draft, LetterContent, NumberingScope, ReferenceString, SequenceNumber, SyncState,
};
use proptest::prelude::*;

fn branch_code_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z0-9]{1,8}"
}

// ============================================================================
// BranchCode Property Tests
// ============================================================================

mod branch_code_tests {
    use super::*;

    proptest! {
        #[test]
        fn alphanumeric_codes_accepted_and_uppercased(code in branch_code_strategy()) {
            let parsed = BranchCode::new(&code).unwrap();
            prop_assert_eq!(parsed.as_str(), code.to_ascii_uppercase());
        }

        #[test]
        fn codes_with_separators_rejected(
            left in "[A-Z]{1,3}",
            sep in prop_oneof![Just('-'), Just('/'), Just(' '), Just('.')],
            right in "[A-Z]{1,3}"
        ) {
            let code = format!("{left}{sep}{right}");
            prop_assert!(BranchCode::new(code).is_err());
        }

        #[test]
        fn codes_longer_than_eight_rejected(code in "[A-Z0-9]{9,20}") {
            prop_assert!(BranchCode::new(code).is_err());
        }
    }
}

// ============================================================================
// ReferenceString Property Tests
// ============================================================================

mod reference_tests {
    use super::*;

    proptest! {
        #[test]
        fn reference_parses_back_to_its_parts(
            code in branch_code_strategy(),
            seq in 1u32..=u32::MAX,
            year in 1000i32..=9999
        ) {
            let scope = NumberingScope::new(BranchCode::new(&code).unwrap(), year).unwrap();
            let reference = ReferenceString::new(scope.clone(), SequenceNumber::new(seq).unwrap());
            let text = reference.to_string();

            prop_assert_eq!(&text, &format!("{}-{seq}/{year}", code.to_ascii_uppercase()));
            let parsed = ReferenceString::parse(&text).unwrap();
            prop_assert_eq!(parsed.scope(), &scope);
            prop_assert_eq!(parsed.sequence_number().get(), seq);
        }

        #[test]
        fn years_outside_four_digits_rejected(
            year in prop_oneof![i32::MIN..1000, 10_000..i32::MAX]
        ) {
            let code = BranchCode::new("RY").unwrap();
            prop_assert!(NumberingScope::new(code, year).is_err());
        }
    }
}

// ============================================================================
// SequenceNumber Property Tests
// ============================================================================

mod sequence_tests {
    use super::*;

    proptest! {
        #[test]
        fn after_max_is_strictly_greater(max in 1u32..u32::MAX) {
            let max = SequenceNumber::new(max).unwrap();
            let next = SequenceNumber::after(Some(max)).unwrap();
            prop_assert!(next > max);
            prop_assert_eq!(next.get(), max.get() + 1);
        }
    }
}

// ============================================================================
// SyncState Property Tests
// ============================================================================

mod sync_state_tests {
    use super::*;

    fn state_strategy() -> impl Strategy<Value = SyncState> {
        prop_oneof![
            Just(SyncState::LocalOnly),
            Just(SyncState::Allocating),
            Just(SyncState::Submitting),
            Just(SyncState::Synced),
            Just(SyncState::Failed),
            Just(SyncState::Abandoned),
        ]
    }

    proptest! {
        #[test]
        fn terminal_states_never_leave(from in state_strategy(), to in state_strategy()) {
            if from.is_terminal() {
                prop_assert!(from.transition(to).is_err());
            }
        }

        #[test]
        fn synced_is_only_reached_from_submitting(from in state_strategy()) {
            prop_assert_eq!(
                from.can_transition_to(SyncState::Synced),
                from == SyncState::Submitting
            );
        }
    }
}

// ============================================================================
// Draft Property Tests
// ============================================================================

mod draft_tests {
    use super::*;

    proptest! {
        #[test]
        fn blank_required_fields_block_finalize(
            subject in "[ \t]{0,3}",
            body in "[a-z ]{1,20}"
        ) {
            let scope = NumberingScope::new(BranchCode::new("RY").unwrap(), 2024).unwrap();
            let draft = Draft::new(scope, LetterContent::new(subject, "ACME", body)).completed();
            prop_assert!(draft.validate_for_finalize().is_err());
        }

        #[test]
        fn cache_preparation_preserves_consistency(
            secs in 0i64..4_000_000_000,
            nanos in 0u32..1_000_000_000
        ) {
            let scope = NumberingScope::new(BranchCode::new("RY").unwrap(), 2024).unwrap();
            let draft = Draft::new(scope, LetterContent::new("s", "r", "b"));
            let now = chrono::DateTime::from_timestamp(secs, nanos).unwrap();
            let stored = draft.prepared_for_cache(now).unwrap();
            prop_assert!(stored.is_consistent());
            prop_assert_eq!(stored.last_saved.timestamp_subsec_nanos() % 1_000, 0);
        }
    }
}
