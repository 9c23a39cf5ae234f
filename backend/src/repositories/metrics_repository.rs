use diesel::prelude::*;
use std::collections::BTreeMap;
use crate::{
    error::AppError,
    models::lead_models::FunnelStage,
    schema::funnel_counters,
    DbPool,
};

pub struct MetricsRepository {
    pool: DbPool,
}

impl MetricsRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn increment(&self, stage: FunnelStage) -> Result<(), AppError> {
        let mut conn = self.pool.get()?;
        conn.transaction::<_, diesel::result::Error, _>(|conn| {
            let updated = diesel::update(funnel_counters::table.find(stage.key()))
                .set(funnel_counters::count.eq(funnel_counters::count + 1i64))
                .execute(conn)?;
            if updated == 0 {
                diesel::insert_into(funnel_counters::table)
                    .values((funnel_counters::stage.eq(stage.key()), funnel_counters::count.eq(1i64)))
                    .execute(conn)?;
            }
            Ok(())
        })?;
        Ok(())
    }

    /// Every known stage is present, zero when never hit.
    pub fn funnel(&self) -> Result<BTreeMap<String, i64>, AppError> {
        let mut conn = self.pool.get()?;
        let rows = funnel_counters::table
            .select((funnel_counters::stage, funnel_counters::count))
            .load::<(String, i64)>(&mut conn)?;
        let mut funnel: BTreeMap<String, i64> = FunnelStage::ALL
            .iter()
            .map(|stage| (stage.key().to_string(), 0))
            .collect();
        for (stage, count) in rows {
            funnel.insert(stage, count);
        }
        Ok(funnel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::lead_repository::tests::memory_pool;

    #[test]
    fn counters_start_at_zero_and_accumulate() {
        let repo = MetricsRepository::new(memory_pool());
        assert_eq!(repo.funnel().unwrap().get("apply"), Some(&0));

        repo.increment(FunnelStage::Apply).unwrap();
        repo.increment(FunnelStage::Apply).unwrap();
        repo.increment(FunnelStage::Enroll).unwrap();

        let funnel = repo.funnel().unwrap();
        assert_eq!(funnel["apply"], 2);
        assert_eq!(funnel["enroll"], 1);
        assert_eq!(funnel["home"], 0);
    }
}
