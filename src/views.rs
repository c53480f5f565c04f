use std::collections::HashSet;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::models::{Block, Launcher, Payout, PayoutEntry};

// Identity making the request, as resolved by the external auth and session
// collaborators. This layer only compares launcher ids.
#[derive(Debug, Clone, Default)]
pub struct Requester {
    pub auth_launcher_id: Option<String>,
    pub session_launcher_id: Option<String>,
}

impl Requester {
    pub fn anonymous() -> Self {
        Requester::default()
    }

    pub fn can_view_private(&self, launcher_id: &str) -> bool {
        self.auth_launcher_id.as_deref() == Some(launcher_id)
            || self.session_launcher_id.as_deref() == Some(launcher_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PayoutSummary {
    pub total_paid: u64,
    pub total_unpaid: u64,
    pub total_transactions: u64,
}

impl PayoutSummary {
    // Fold over one point-in-time read of the launcher's payout-address rows.
    // Paid requires a linked transaction with a confirmed block index; a
    // missing or pending transaction makes the row unpaid. The transaction
    // count is distinct by on-chain name, not by row.
    pub fn from_entries(entries: &[PayoutEntry]) -> Self {
        let mut total_paid = 0u64;
        let mut total_unpaid = 0u64;
        let mut confirmed_txns = HashSet::new();

        for entry in entries {
            match (&entry.transaction, entry.confirmed_block_index) {
                (Some(transaction), Some(_)) => {
                    total_paid += entry.amount;
                    confirmed_txns.insert(transaction.as_str());
                }
                _ => total_unpaid += entry.amount,
            }
        }

        PayoutSummary {
            total_paid,
            total_unpaid,
            total_transactions: confirmed_txns.len() as u64,
        }
    }
}

// Percentage share of the pool's points. Not clamped and not rounded: the
// total is read separately from the per-launcher row, so concurrent updates
// may push the result slightly past 100.
pub fn points_of_total(points: u64, total_points: u64) -> f64 {
    if total_points == 0 {
        return 0.0;
    }
    (points as f64 / total_points as f64) * 100.0
}

#[derive(Debug, Clone, Serialize)]
pub struct PublicLauncherView {
    pub launcher_id: String,
    pub name: Option<String>,
    pub p2_singleton_puzzle_hash: String,
    pub points: u64,
    pub points_pplns: u64,
    pub share_pplns: f64,
    pub difficulty: u64,
    pub is_pool_member: bool,
    pub points_of_total: f64,
    pub estimated_size: u64,
    pub joined_at: NaiveDateTime,
    pub payout: PayoutSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct PrivateLauncherView {
    #[serde(flatten)]
    pub public: PublicLauncherView,
    pub email: Option<String>,
    pub notify_missing_partials_hours: Option<i32>,
    pub push_missing_partials_hours: Option<i32>,
    pub push_block_farmed: bool,
    pub fcm_token: Option<String>,
    pub custom_difficulty: Option<String>,
    pub minimum_payout: Option<u64>,
    pub referrer: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum LauncherView {
    Private(PrivateLauncherView),
    Public(PublicLauncherView),
}

pub fn project_launcher_public(
    launcher: &Launcher,
    total_points: u64,
    payout_entries: &[PayoutEntry],
) -> PublicLauncherView {
    PublicLauncherView {
        launcher_id: launcher.launcher_id.clone(),
        name: launcher.name.clone(),
        p2_singleton_puzzle_hash: launcher.p2_singleton_puzzle_hash.clone(),
        points: launcher.points,
        points_pplns: launcher.points_pplns,
        share_pplns: launcher.share_pplns,
        difficulty: launcher.difficulty,
        is_pool_member: launcher.is_pool_member,
        points_of_total: points_of_total(launcher.points, total_points),
        estimated_size: launcher.estimated_size,
        joined_at: launcher.joined_at,
        payout: PayoutSummary::from_entries(payout_entries),
    }
}

// Private fields are gated per record: a list projection evaluates the same
// requester against each launcher id independently. Non-owners get a view
// with the private keys absent, not nulled.
pub fn project_launcher(
    launcher: &Launcher,
    total_points: u64,
    payout_entries: &[PayoutEntry],
    referrer: Option<String>,
    requester: &Requester,
) -> LauncherView {
    let public = project_launcher_public(launcher, total_points, payout_entries);

    if requester.can_view_private(&launcher.launcher_id) {
        LauncherView::Private(PrivateLauncherView {
            public,
            email: launcher.email.clone(),
            notify_missing_partials_hours: launcher.notify_missing_partials_hours,
            push_missing_partials_hours: launcher.push_missing_partials_hours,
            push_block_farmed: launcher.push_block_farmed,
            fcm_token: launcher.fcm_token.clone(),
            custom_difficulty: launcher.custom_difficulty.clone(),
            minimum_payout: launcher.minimum_payout,
            referrer,
        })
    } else {
        LauncherView::Public(public)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BlockView {
    pub id: i32,
    pub name: String,
    pub singleton: String,
    pub timestamp: u64,
    pub confirmed_block_index: u64,
    pub puzzle_hash: String,
    pub amount: u64,
    pub farmed_by: PublicLauncherView,
    pub payout_id: Option<i32>,
}

impl BlockView {
    pub fn new(block: &Block, farmed_by: PublicLauncherView) -> Self {
        BlockView {
            id: block.id,
            name: block.name.clone(),
            singleton: block.singleton.clone(),
            timestamp: block.timestamp,
            confirmed_block_index: block.confirmed_block_index,
            puzzle_hash: block.puzzle_hash.clone(),
            amount: block.amount,
            farmed_by,
            payout_id: block.payout_id,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PayoutView {
    pub id: i32,
    pub datetime: NaiveDateTime,
    pub amount: u64,
    pub fee: u64,
    pub blocks: Vec<String>,
}

impl PayoutView {
    pub fn new(payout: &Payout, blocks: Vec<String>) -> Self {
        PayoutView {
            id: payout.id,
            datetime: payout.datetime,
            amount: payout.amount,
            fee: payout.fee,
            blocks,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TransactionView {
    pub transaction: String,
    pub created_at_time: u64,
    pub confirmed_block_index: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PayoutAddressView {
    pub id: i32,
    pub payout: PayoutView,
    pub puzzle_hash: String,
    pub launcher: PublicLauncherView,
    pub amount: u64,
    pub transaction: Option<TransactionView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RewardRecord {
    pub name: String,
    pub amount: u64,
    pub timestamp: u64,
    pub farmed_by: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatsView {
    pub blockchain_height: u64,
    pub blockchain_space: u64,
    pub fee: f64,
    pub estimate_win: u64,
    pub time_since_last_win: u64,
    pub rewards_amount: f64,
    pub rewards_blocks: i64,
    pub last_rewards: Vec<RewardRecord>,
    pub pool_space: u64,
    pub farmers: i64,
    pub farmers_active: i64,
    pub reward_system: String,
    pub xch_current_price: serde_json::Value,
    pub pool_wallets: serde_json::Value,
    pub average_effort: u64,
    pub xch_tb_month: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRIVATE_FIELDS: [&str; 8] = [
        "email",
        "notify_missing_partials_hours",
        "push_missing_partials_hours",
        "push_block_farmed",
        "fcm_token",
        "custom_difficulty",
        "minimum_payout",
        "referrer",
    ];

    fn test_launcher() -> Launcher {
        Launcher {
            launcher_id: "0xaaa1".to_string(),
            name: Some("farmer one".to_string()),
            p2_singleton_puzzle_hash: "0xp2hash".to_string(),
            points: 25,
            points_pplns: 20,
            share_pplns: 0.2,
            difficulty: 4,
            custom_difficulty: Some("HIGH".to_string()),
            is_pool_member: true,
            estimated_size: 104857600,
            joined_at: NaiveDateTime::parse_from_str("2023-05-01 10:00:00", "%Y-%m-%d %H:%M:%S")
                .unwrap(),
            email: Some("farmer@example.com".to_string()),
            notify_missing_partials_hours: Some(3),
            push_missing_partials_hours: None,
            push_block_farmed: true,
            fcm_token: Some("fcm-token".to_string()),
            minimum_payout: Some(50_000_000_000),
        }
    }

    fn entry(amount: u64, transaction: Option<&str>, confirmed: Option<u64>) -> PayoutEntry {
        PayoutEntry {
            amount,
            transaction: transaction.map(|t| t.to_string()),
            confirmed_block_index: confirmed,
        }
    }

    #[test]
    fn payout_summary_defaults_to_zero_without_rows() {
        let summary = PayoutSummary::from_entries(&[]);
        assert_eq!(
            summary,
            PayoutSummary {
                total_paid: 0,
                total_unpaid: 0,
                total_transactions: 0,
            }
        );
    }

    #[test]
    fn payout_summary_counts_distinct_confirmed_transactions() {
        let entries = vec![
            entry(10, Some("0xtxn1"), Some(4_200_000)),
            entry(15, Some("0xtxn1"), Some(4_200_000)),
            entry(5, Some("0xtxn2"), None),
        ];
        let summary = PayoutSummary::from_entries(&entries);
        assert_eq!(summary.total_paid, 25);
        assert_eq!(summary.total_unpaid, 5);
        assert_eq!(summary.total_transactions, 1);
    }

    #[test]
    fn payout_summary_treats_missing_transaction_as_unpaid() {
        let entries = vec![entry(7, None, None), entry(3, Some("0xtxn1"), None)];
        let summary = PayoutSummary::from_entries(&entries);
        assert_eq!(summary.total_paid, 0);
        assert_eq!(summary.total_unpaid, 10);
        assert_eq!(summary.total_transactions, 0);
    }

    #[test]
    fn points_of_total_is_zero_without_total() {
        assert_eq!(points_of_total(25, 0), 0.0);
    }

    #[test]
    fn points_of_total_is_uncorrected_percentage() {
        assert_eq!(points_of_total(25, 100), 25.0);
        // concurrent updates elsewhere can push past 100; not clamped here
        assert!(points_of_total(150, 100) > 100.0);
    }

    #[test]
    fn anonymous_requester_gets_public_view_without_private_keys() {
        let launcher = test_launcher();
        let view = project_launcher(&launcher, 100, &[], None, &Requester::anonymous());

        let json = serde_json::to_value(&view).unwrap();
        let obj = json.as_object().unwrap();
        for field in PRIVATE_FIELDS {
            assert!(!obj.contains_key(field), "leaked private field {}", field);
        }
        assert_eq!(obj["launcher_id"], "0xaaa1");
        assert_eq!(obj["points_of_total"], 25.0);
    }

    #[test]
    fn mismatched_identities_get_public_view() {
        let launcher = test_launcher();
        let requester = Requester {
            auth_launcher_id: Some("0xbbb2".to_string()),
            session_launcher_id: Some("0xccc3".to_string()),
        };
        let view = project_launcher(&launcher, 100, &[], None, &requester);

        let json = serde_json::to_value(&view).unwrap();
        for field in PRIVATE_FIELDS {
            assert!(!json.as_object().unwrap().contains_key(field));
        }
    }

    #[test]
    fn authenticated_owner_gets_all_private_fields() {
        let launcher = test_launcher();
        let requester = Requester {
            auth_launcher_id: Some("0xaaa1".to_string()),
            session_launcher_id: None,
        };
        let view = project_launcher(
            &launcher,
            100,
            &[],
            Some("0xref9".to_string()),
            &requester,
        );

        let json = serde_json::to_value(&view).unwrap();
        let obj = json.as_object().unwrap();
        for field in PRIVATE_FIELDS {
            assert!(obj.contains_key(field), "missing private field {}", field);
        }
        assert_eq!(obj["email"], "farmer@example.com");
        assert_eq!(obj["referrer"], "0xref9");
        // public fields ride along in the flattened shape
        assert_eq!(obj["p2_singleton_puzzle_hash"], "0xp2hash");
    }

    #[test]
    fn session_identity_also_unlocks_private_fields() {
        let launcher = test_launcher();
        let requester = Requester {
            auth_launcher_id: None,
            session_launcher_id: Some("0xaaa1".to_string()),
        };
        let view = project_launcher(&launcher, 100, &[], None, &requester);

        let json = serde_json::to_value(&view).unwrap();
        let obj = json.as_object().unwrap();
        for field in PRIVATE_FIELDS {
            assert!(obj.contains_key(field));
        }
        // no active referral resolves to null, not an error
        assert!(obj["referrer"].is_null());
    }

    #[test]
    fn list_projection_gates_each_record_independently() {
        let owned = test_launcher();
        let mut other = test_launcher();
        other.launcher_id = "0xbbb2".to_string();

        let requester = Requester {
            auth_launcher_id: Some("0xaaa1".to_string()),
            session_launcher_id: None,
        };

        let views: Vec<LauncherView> = [&owned, &other]
            .iter()
            .map(|l| project_launcher(l, 50, &[], None, &requester))
            .collect();

        let first = serde_json::to_value(&views[0]).unwrap();
        let second = serde_json::to_value(&views[1]).unwrap();
        assert!(first.as_object().unwrap().contains_key("email"));
        assert!(!second.as_object().unwrap().contains_key("email"));
    }
}
