use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel::sql_types::{Bigint, Integer, Nullable, Text, Timestamp, Unsigned, Varchar};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, QueryableByName)]
#[diesel(table_name = crate::schema::launchers)]
#[diesel(check_for_backend(diesel::mysql::Mysql))]
pub struct Launcher {
    pub launcher_id: String,
    pub name: Option<String>,
    pub p2_singleton_puzzle_hash: String,
    pub points: u64,
    pub points_pplns: u64,
    pub share_pplns: f64,
    pub difficulty: u64,
    pub custom_difficulty: Option<String>,
    pub is_pool_member: bool,
    pub estimated_size: u64,
    pub joined_at: NaiveDateTime,
    pub email: Option<String>,
    pub notify_missing_partials_hours: Option<i32>,
    pub push_missing_partials_hours: Option<i32>,
    pub push_block_farmed: bool,
    pub fcm_token: Option<String>,
    pub minimum_payout: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, QueryableByName)]
#[diesel(table_name = crate::schema::blocks)]
#[diesel(check_for_backend(diesel::mysql::Mysql))]
pub struct Block {
    pub id: i32,
    pub name: String,
    pub singleton: String,
    pub timestamp: u64,
    pub confirmed_block_index: u64,
    pub puzzle_hash: String,
    pub amount: u64,
    pub farmed_by: String,
    pub payout_id: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, QueryableByName)]
#[diesel(table_name = crate::schema::partials)]
#[diesel(check_for_backend(diesel::mysql::Mysql))]
pub struct Partial {
    pub id: i32,
    pub launcher_id: String,
    pub timestamp: u64,
    pub difficulty: u64,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, QueryableByName)]
#[diesel(table_name = crate::schema::payouts)]
#[diesel(check_for_backend(diesel::mysql::Mysql))]
pub struct Payout {
    pub id: i32,
    pub datetime: NaiveDateTime,
    pub amount: u64,
    pub fee: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, QueryableByName)]
#[diesel(table_name = crate::schema::transactions)]
#[diesel(check_for_backend(diesel::mysql::Mysql))]
pub struct Transaction {
    pub id: i32,
    pub transaction: String,
    pub created_at_time: u64,
    pub confirmed_block_index: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, QueryableByName)]
#[diesel(table_name = crate::schema::global_info)]
#[diesel(check_for_backend(diesel::mysql::Mysql))]
pub struct GlobalInfo {
    pub id: i32,
    pub blockchain_height: u64,
    pub blockchain_space: u64,
    pub xch_current_price: String,
    pub pool_wallets: String,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, QueryableByName)]
#[diesel(table_name = crate::schema::pool_space)]
#[diesel(check_for_backend(diesel::mysql::Mysql))]
pub struct PoolSpaceSnapshot {
    pub date: NaiveDateTime,
    pub size: u64,
}

// One payout-address row joined to its transaction's confirmation state.
// A row is paid iff the transaction exists and has a confirmed block index.
#[derive(Debug, Clone, Serialize, Deserialize, QueryableByName)]
pub struct PayoutEntry {
    #[diesel(sql_type = Unsigned<Bigint>)]
    pub amount: u64,
    #[diesel(sql_type = Nullable<Varchar>)]
    pub transaction: Option<String>,
    #[diesel(sql_type = Nullable<Unsigned<Bigint>>)]
    pub confirmed_block_index: Option<u64>,
}

#[derive(Debug, QueryableByName)]
pub struct TotalPoints {
    #[diesel(sql_type = Unsigned<Bigint>)]
    pub total: u64,
}

#[derive(Debug, QueryableByName)]
pub struct ReferrerRow {
    #[diesel(sql_type = Varchar)]
    pub referrer_id: String,
}

#[derive(Debug, QueryableByName)]
pub struct BlockNameRow {
    #[diesel(sql_type = Varchar)]
    pub name: String,
}

#[derive(Debug, QueryableByName)]
pub struct FarmerCounts {
    #[diesel(sql_type = Bigint)]
    pub farmers: i64,
    #[diesel(sql_type = Bigint)]
    pub farmers_active: i64,
}

#[derive(Debug, QueryableByName)]
pub struct PoolSpaceTotal {
    #[diesel(sql_type = Unsigned<Bigint>)]
    pub total: u64,
}

#[derive(Debug, QueryableByName)]
pub struct BlockStats {
    #[diesel(sql_type = Bigint)]
    pub count: i64,
    #[diesel(sql_type = Unsigned<Bigint>)]
    pub amount: u64,
    #[diesel(sql_type = Nullable<Unsigned<Bigint>>)]
    pub latest_timestamp: Option<u64>,
}

// Flattened payout-address row with its payout and (optional) transaction,
// fetched in one query for the /payoutaddresses embedding.
#[derive(Debug, QueryableByName)]
pub struct PayoutAddressDetail {
    #[diesel(sql_type = Integer)]
    pub id: i32,
    #[diesel(sql_type = Varchar)]
    pub puzzle_hash: String,
    #[diesel(sql_type = Unsigned<Bigint>)]
    pub amount: u64,
    #[diesel(sql_type = Integer)]
    pub payout_id: i32,
    #[diesel(sql_type = Timestamp)]
    pub payout_datetime: NaiveDateTime,
    #[diesel(sql_type = Unsigned<Bigint>)]
    pub payout_amount: u64,
    #[diesel(sql_type = Unsigned<Bigint>)]
    pub payout_fee: u64,
    #[diesel(sql_type = Nullable<Varchar>)]
    pub transaction: Option<String>,
    #[diesel(sql_type = Nullable<Unsigned<Bigint>>)]
    pub transaction_created_at_time: Option<u64>,
    #[diesel(sql_type = Nullable<Unsigned<Bigint>>)]
    pub transaction_confirmed_block_index: Option<u64>,
}

#[derive(Debug, Serialize, QueryableByName)]
pub struct TimeseriesRow {
    #[diesel(sql_type = Text)]
    pub datetime: String,
    #[diesel(sql_type = Bigint)]
    pub field: i64,
    #[diesel(sql_type = Bigint)]
    pub value: i64,
}
