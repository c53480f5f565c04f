use chrono::NaiveDateTime;
use deadpool_diesel::mysql::{Manager, Pool};
use diesel::{
    sql_types::{Bigint, Bool, Integer, Nullable, Timestamp, Unsigned, Varchar},
    MysqlConnection, RunQueryDsl,
};

use crate::models::{
    Block, BlockNameRow, BlockStats, FarmerCounts, GlobalInfo, Launcher, Partial, Payout,
    PayoutAddressDetail, PayoutEntry, PoolSpaceSnapshot, PoolSpaceTotal, ReferrerRow,
    TimeseriesRow, TotalPoints, Transaction,
};
use crate::validation::ValidatedLauncherUpdate;

const LAUNCHER_COLUMNS: &str = "launcher_id, name, p2_singleton_puzzle_hash, points, \
    points_pplns, share_pplns, difficulty, custom_difficulty, is_pool_member, \
    estimated_size, joined_at, email, notify_missing_partials_hours, \
    push_missing_partials_hours, push_block_farmed, fcm_token, minimum_payout";

#[derive(Debug)]
pub enum AppDatabaseError {
    FailedToGetConnectionFromPool,
    EntityDoesNotExist,
    FailedToUpdateEntity,
    QueryFailed,
}

pub struct AppDatabase {
    connection_pool: Pool,
}

impl AppDatabase {
    pub fn new(url: String) -> Self {
        let manager = Manager::new(url, deadpool_diesel::Runtime::Tokio1);

        let pool = Pool::builder(manager).build().unwrap();

        AppDatabase {
            connection_pool: pool,
        }
    }

    pub async fn get_launcher(&self, launcher_id: String) -> Result<Launcher, AppDatabaseError> {
        if let Ok(db_conn) = self.connection_pool.get().await {
            let res = db_conn
                .interact(move |conn: &mut MysqlConnection| {
                    diesel::sql_query(format!(
                        "SELECT {} FROM launchers WHERE launchers.launcher_id = ?",
                        LAUNCHER_COLUMNS
                    ))
                    .bind::<Varchar, _>(launcher_id)
                    .get_result::<Launcher>(conn)
                })
                .await;

            match res {
                Ok(Ok(launcher)) => Ok(launcher),
                Ok(Err(diesel::result::Error::NotFound)) => {
                    Err(AppDatabaseError::EntityDoesNotExist)
                }
                _ => Err(AppDatabaseError::QueryFailed),
            }
        } else {
            Err(AppDatabaseError::FailedToGetConnectionFromPool)
        }
    }

    pub async fn get_launchers(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Launcher>, AppDatabaseError> {
        if let Ok(db_conn) = self.connection_pool.get().await {
            let res = db_conn
                .interact(move |conn: &mut MysqlConnection| {
                    diesel::sql_query(format!(
                        "SELECT {} FROM launchers ORDER BY points_pplns DESC, launcher_id ASC LIMIT ? OFFSET ?",
                        LAUNCHER_COLUMNS
                    ))
                    .bind::<Bigint, _>(limit)
                    .bind::<Bigint, _>(offset)
                    .get_results::<Launcher>(conn)
                })
                .await;

            match res {
                Ok(Ok(launchers)) => Ok(launchers),
                _ => Err(AppDatabaseError::QueryFailed),
            }
        } else {
            Err(AppDatabaseError::FailedToGetConnectionFromPool)
        }
    }

    pub async fn get_total_points(&self) -> Result<u64, AppDatabaseError> {
        if let Ok(db_conn) = self.connection_pool.get().await {
            let res = db_conn
                .interact(move |conn: &mut MysqlConnection| {
                    diesel::sql_query(
                        "SELECT CAST(COALESCE(SUM(points), 0) AS UNSIGNED) AS total FROM launchers",
                    )
                    .get_result::<TotalPoints>(conn)
                })
                .await;

            match res {
                Ok(Ok(row)) => Ok(row.total),
                _ => Err(AppDatabaseError::QueryFailed),
            }
        } else {
            Err(AppDatabaseError::FailedToGetConnectionFromPool)
        }
    }

    // One point-in-time read of the launcher's payout-address rows with their
    // transaction confirmation state. The paid/unpaid/distinct-count fold over
    // these rows happens in views::PayoutSummary.
    pub async fn get_payout_entries(
        &self,
        launcher_id: String,
    ) -> Result<Vec<PayoutEntry>, AppDatabaseError> {
        if let Ok(db_conn) = self.connection_pool.get().await {
            let res = db_conn
                .interact(move |conn: &mut MysqlConnection| {
                    diesel::sql_query(
                        "SELECT pa.amount, t.transaction, t.confirmed_block_index \
                         FROM payout_addresses pa \
                         LEFT JOIN transactions t ON t.id = pa.transaction_id \
                         WHERE pa.launcher_id = ?",
                    )
                    .bind::<Varchar, _>(launcher_id)
                    .get_results::<PayoutEntry>(conn)
                })
                .await;

            match res {
                Ok(Ok(entries)) => Ok(entries),
                _ => Err(AppDatabaseError::QueryFailed),
            }
        } else {
            Err(AppDatabaseError::FailedToGetConnectionFromPool)
        }
    }

    // Most recently created active referral wins; id breaks created_at ties.
    // A launcher without one is a miss, not an error.
    pub async fn get_active_referrer(
        &self,
        launcher_id: String,
    ) -> Result<Option<String>, AppDatabaseError> {
        if let Ok(db_conn) = self.connection_pool.get().await {
            let res = db_conn
                .interact(move |conn: &mut MysqlConnection| {
                    diesel::sql_query(
                        "SELECT referrer_id FROM referrals \
                         WHERE launcher_id = ? AND active = TRUE \
                         ORDER BY created_at DESC, id DESC LIMIT 1",
                    )
                    .bind::<Varchar, _>(launcher_id)
                    .get_result::<ReferrerRow>(conn)
                })
                .await;

            match res {
                Ok(Ok(row)) => Ok(Some(row.referrer_id)),
                Ok(Err(diesel::result::Error::NotFound)) => Ok(None),
                _ => Err(AppDatabaseError::QueryFailed),
            }
        } else {
            Err(AppDatabaseError::FailedToGetConnectionFromPool)
        }
    }

    // Read-modify-write of the launcher row plus referral maintenance. The
    // update has already passed validation as a whole; absent fields keep the
    // stored value, present-null fields clear it.
    pub async fn apply_launcher_update(
        &self,
        launcher_id: String,
        update: ValidatedLauncherUpdate,
    ) -> Result<(), AppDatabaseError> {
        let launcher = self.get_launcher(launcher_id.clone()).await?;

        if let Ok(db_conn) = self.connection_pool.get().await {
            let res = db_conn
                .interact(move |conn: &mut MysqlConnection| {
                    let updated = update.apply_to(&launcher);

                    diesel::sql_query(
                        "UPDATE launchers SET name = ?, email = ?, \
                         notify_missing_partials_hours = ?, push_missing_partials_hours = ?, \
                         push_block_farmed = ?, fcm_token = ?, custom_difficulty = ?, \
                         minimum_payout = ? WHERE launcher_id = ?",
                    )
                    .bind::<Nullable<Varchar>, _>(updated.name)
                    .bind::<Nullable<Varchar>, _>(updated.email)
                    .bind::<Nullable<Integer>, _>(updated.notify_missing_partials_hours)
                    .bind::<Nullable<Integer>, _>(updated.push_missing_partials_hours)
                    .bind::<Bool, _>(updated.push_block_farmed)
                    .bind::<Nullable<Varchar>, _>(updated.fcm_token)
                    .bind::<Nullable<Varchar>, _>(updated.custom_difficulty)
                    .bind::<Nullable<Unsigned<Bigint>>, _>(updated.minimum_payout)
                    .bind::<Varchar, _>(launcher.launcher_id.clone())
                    .execute(conn)?;

                    if let Some(referrer) = update.referrer {
                        diesel::sql_query(
                            "UPDATE referrals SET active = FALSE \
                             WHERE launcher_id = ? AND active = TRUE",
                        )
                        .bind::<Varchar, _>(launcher.launcher_id.clone())
                        .execute(conn)?;

                        if let Some(referrer_id) = referrer {
                            diesel::sql_query(
                                "INSERT INTO referrals (launcher_id, referrer_id, active) \
                                 VALUES (?, ?, TRUE)",
                            )
                            .bind::<Varchar, _>(launcher.launcher_id.clone())
                            .bind::<Varchar, _>(referrer_id)
                            .execute(conn)?;
                        }
                    }

                    Ok::<(), diesel::result::Error>(())
                })
                .await;

            match res {
                Ok(Ok(())) => Ok(()),
                _ => Err(AppDatabaseError::FailedToUpdateEntity),
            }
        } else {
            Err(AppDatabaseError::FailedToGetConnectionFromPool)
        }
    }

    pub async fn get_blocks(&self, limit: i64, offset: i64) -> Result<Vec<Block>, AppDatabaseError> {
        if let Ok(db_conn) = self.connection_pool.get().await {
            let res = db_conn
                .interact(move |conn: &mut MysqlConnection| {
                    diesel::sql_query(
                        "SELECT id, name, singleton, timestamp, confirmed_block_index, \
                         puzzle_hash, amount, farmed_by, payout_id FROM blocks \
                         ORDER BY confirmed_block_index DESC LIMIT ? OFFSET ?",
                    )
                    .bind::<Bigint, _>(limit)
                    .bind::<Bigint, _>(offset)
                    .get_results::<Block>(conn)
                })
                .await;

            match res {
                Ok(Ok(blocks)) => Ok(blocks),
                _ => Err(AppDatabaseError::QueryFailed),
            }
        } else {
            Err(AppDatabaseError::FailedToGetConnectionFromPool)
        }
    }

    pub async fn get_block_names_for_payout(
        &self,
        payout_id: i32,
    ) -> Result<Vec<String>, AppDatabaseError> {
        if let Ok(db_conn) = self.connection_pool.get().await {
            let res = db_conn
                .interact(move |conn: &mut MysqlConnection| {
                    diesel::sql_query(
                        "SELECT name FROM blocks WHERE payout_id = ? ORDER BY confirmed_block_index ASC",
                    )
                    .bind::<Integer, _>(payout_id)
                    .get_results::<BlockNameRow>(conn)
                })
                .await;

            match res {
                Ok(Ok(rows)) => Ok(rows.into_iter().map(|r| r.name).collect()),
                _ => Err(AppDatabaseError::QueryFailed),
            }
        } else {
            Err(AppDatabaseError::FailedToGetConnectionFromPool)
        }
    }

    pub async fn get_partials(
        &self,
        launcher_id: Option<String>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Partial>, AppDatabaseError> {
        if let Ok(db_conn) = self.connection_pool.get().await {
            let res = db_conn
                .interact(move |conn: &mut MysqlConnection| {
                    if let Some(launcher_id) = launcher_id {
                        diesel::sql_query(
                            "SELECT id, launcher_id, timestamp, difficulty, error FROM partials \
                             WHERE launcher_id = ? ORDER BY timestamp DESC LIMIT ? OFFSET ?",
                        )
                        .bind::<Varchar, _>(launcher_id)
                        .bind::<Bigint, _>(limit)
                        .bind::<Bigint, _>(offset)
                        .get_results::<Partial>(conn)
                    } else {
                        diesel::sql_query(
                            "SELECT id, launcher_id, timestamp, difficulty, error FROM partials \
                             ORDER BY timestamp DESC LIMIT ? OFFSET ?",
                        )
                        .bind::<Bigint, _>(limit)
                        .bind::<Bigint, _>(offset)
                        .get_results::<Partial>(conn)
                    }
                })
                .await;

            match res {
                Ok(Ok(partials)) => Ok(partials),
                _ => Err(AppDatabaseError::QueryFailed),
            }
        } else {
            Err(AppDatabaseError::FailedToGetConnectionFromPool)
        }
    }

    pub async fn get_payouts(&self, limit: i64, offset: i64) -> Result<Vec<Payout>, AppDatabaseError> {
        if let Ok(db_conn) = self.connection_pool.get().await {
            let res = db_conn
                .interact(move |conn: &mut MysqlConnection| {
                    diesel::sql_query(
                        "SELECT id, datetime, amount, fee FROM payouts \
                         ORDER BY datetime DESC LIMIT ? OFFSET ?",
                    )
                    .bind::<Bigint, _>(limit)
                    .bind::<Bigint, _>(offset)
                    .get_results::<Payout>(conn)
                })
                .await;

            match res {
                Ok(Ok(payouts)) => Ok(payouts),
                _ => Err(AppDatabaseError::QueryFailed),
            }
        } else {
            Err(AppDatabaseError::FailedToGetConnectionFromPool)
        }
    }

    pub async fn get_payout_address_details(
        &self,
        launcher_id: String,
    ) -> Result<Vec<PayoutAddressDetail>, AppDatabaseError> {
        if let Ok(db_conn) = self.connection_pool.get().await {
            let res = db_conn
                .interact(move |conn: &mut MysqlConnection| {
                    diesel::sql_query(
                        "SELECT pa.id, pa.puzzle_hash, pa.amount, \
                         p.id AS payout_id, p.datetime AS payout_datetime, \
                         p.amount AS payout_amount, p.fee AS payout_fee, \
                         t.transaction, t.created_at_time AS transaction_created_at_time, \
                         t.confirmed_block_index AS transaction_confirmed_block_index \
                         FROM payout_addresses pa \
                         INNER JOIN payouts p ON p.id = pa.payout_id \
                         LEFT JOIN transactions t ON t.id = pa.transaction_id \
                         WHERE pa.launcher_id = ? ORDER BY p.datetime DESC",
                    )
                    .bind::<Varchar, _>(launcher_id)
                    .get_results::<PayoutAddressDetail>(conn)
                })
                .await;

            match res {
                Ok(Ok(rows)) => Ok(rows),
                _ => Err(AppDatabaseError::QueryFailed),
            }
        } else {
            Err(AppDatabaseError::FailedToGetConnectionFromPool)
        }
    }

    pub async fn get_transactions(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Transaction>, AppDatabaseError> {
        if let Ok(db_conn) = self.connection_pool.get().await {
            let res = db_conn
                .interact(move |conn: &mut MysqlConnection| {
                    diesel::sql_query(
                        "SELECT id, transaction, created_at_time, confirmed_block_index \
                         FROM transactions ORDER BY created_at_time DESC LIMIT ? OFFSET ?",
                    )
                    .bind::<Bigint, _>(limit)
                    .bind::<Bigint, _>(offset)
                    .get_results::<Transaction>(conn)
                })
                .await;

            match res {
                Ok(Ok(txns)) => Ok(txns),
                _ => Err(AppDatabaseError::QueryFailed),
            }
        } else {
            Err(AppDatabaseError::FailedToGetConnectionFromPool)
        }
    }

    pub async fn get_farmer_counts(&self) -> Result<FarmerCounts, AppDatabaseError> {
        if let Ok(db_conn) = self.connection_pool.get().await {
            let res = db_conn
                .interact(move |conn: &mut MysqlConnection| {
                    diesel::sql_query(
                        "SELECT COUNT(launcher_id) AS farmers, \
                         CAST(COALESCE(SUM(is_pool_member), 0) AS SIGNED) AS farmers_active \
                         FROM launchers",
                    )
                    .get_result::<FarmerCounts>(conn)
                })
                .await;

            match res {
                Ok(Ok(counts)) => Ok(counts),
                _ => Err(AppDatabaseError::QueryFailed),
            }
        } else {
            Err(AppDatabaseError::FailedToGetConnectionFromPool)
        }
    }

    pub async fn get_pool_space_total(&self) -> Result<u64, AppDatabaseError> {
        if let Ok(db_conn) = self.connection_pool.get().await {
            let res = db_conn
                .interact(move |conn: &mut MysqlConnection| {
                    diesel::sql_query(
                        "SELECT CAST(COALESCE(SUM(estimated_size), 0) AS UNSIGNED) AS total \
                         FROM launchers WHERE is_pool_member = TRUE",
                    )
                    .get_result::<PoolSpaceTotal>(conn)
                })
                .await;

            match res {
                Ok(Ok(row)) => Ok(row.total),
                _ => Err(AppDatabaseError::QueryFailed),
            }
        } else {
            Err(AppDatabaseError::FailedToGetConnectionFromPool)
        }
    }

    pub async fn get_block_stats(&self) -> Result<BlockStats, AppDatabaseError> {
        if let Ok(db_conn) = self.connection_pool.get().await {
            let res = db_conn
                .interact(move |conn: &mut MysqlConnection| {
                    diesel::sql_query(
                        "SELECT COUNT(id) AS count, \
                         CAST(COALESCE(SUM(amount), 0) AS UNSIGNED) AS amount, \
                         MAX(timestamp) AS latest_timestamp FROM blocks",
                    )
                    .get_result::<BlockStats>(conn)
                })
                .await;

            match res {
                Ok(Ok(stats)) => Ok(stats),
                _ => Err(AppDatabaseError::QueryFailed),
            }
        } else {
            Err(AppDatabaseError::FailedToGetConnectionFromPool)
        }
    }

    pub async fn get_recent_blocks(&self, limit: i64) -> Result<Vec<Block>, AppDatabaseError> {
        self.get_blocks(limit, 0).await
    }

    pub async fn get_global_info(&self) -> Result<Option<GlobalInfo>, AppDatabaseError> {
        if let Ok(db_conn) = self.connection_pool.get().await {
            let res = db_conn
                .interact(move |conn: &mut MysqlConnection| {
                    diesel::sql_query(
                        "SELECT id, blockchain_height, blockchain_space, xch_current_price, \
                         pool_wallets, updated_at FROM global_info ORDER BY id ASC LIMIT 1",
                    )
                    .get_result::<GlobalInfo>(conn)
                })
                .await;

            match res {
                Ok(Ok(info)) => Ok(Some(info)),
                Ok(Err(diesel::result::Error::NotFound)) => Ok(None),
                _ => Err(AppDatabaseError::QueryFailed),
            }
        } else {
            Err(AppDatabaseError::FailedToGetConnectionFromPool)
        }
    }

    pub async fn get_space_series(
        &self,
        since: NaiveDateTime,
    ) -> Result<Vec<PoolSpaceSnapshot>, AppDatabaseError> {
        if let Ok(db_conn) = self.connection_pool.get().await {
            let res = db_conn
                .interact(move |conn: &mut MysqlConnection| {
                    diesel::sql_query(
                        "SELECT date, size FROM pool_space WHERE date >= ? ORDER BY date ASC",
                    )
                    .bind::<Timestamp, _>(since)
                    .get_results::<PoolSpaceSnapshot>(conn)
                })
                .await;

            match res {
                Ok(Ok(rows)) => Ok(rows),
                _ => Err(AppDatabaseError::QueryFailed),
            }
        } else {
            Err(AppDatabaseError::FailedToGetConnectionFromPool)
        }
    }

    // Hour-bucketed partial activity: submitting launchers and partial count
    // per bucket.
    pub async fn get_partial_timeseries(
        &self,
        since_timestamp: u64,
    ) -> Result<Vec<TimeseriesRow>, AppDatabaseError> {
        if let Ok(db_conn) = self.connection_pool.get().await {
            let res = db_conn
                .interact(move |conn: &mut MysqlConnection| {
                    diesel::sql_query(
                        "SELECT DATE_FORMAT(FROM_UNIXTIME(timestamp), '%Y-%m-%dT%H:00:00') AS datetime, \
                         CAST(COUNT(DISTINCT launcher_id) AS SIGNED) AS field, \
                         CAST(COUNT(id) AS SIGNED) AS value \
                         FROM partials WHERE timestamp >= ? \
                         GROUP BY datetime ORDER BY datetime ASC",
                    )
                    .bind::<Unsigned<Bigint>, _>(since_timestamp)
                    .get_results::<TimeseriesRow>(conn)
                })
                .await;

            match res {
                Ok(Ok(rows)) => Ok(rows),
                _ => Err(AppDatabaseError::QueryFailed),
            }
        } else {
            Err(AppDatabaseError::FailedToGetConnectionFromPool)
        }
    }
}
