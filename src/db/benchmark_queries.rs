use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use sqlx::PgPool;

pub async fn upsert_close(pool: &PgPool, ticker: &str, date: NaiveDate, close: BigDecimal) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO benchmark_history (ticker, trade_date, close)
         VALUES ($1, $2, $3)
         ON CONFLICT (ticker, trade_date) DO UPDATE SET close = EXCLUDED.close",
    )
    .bind(ticker)
    .bind(date)
    .bind(close)
    .execute(pool)
    .await?;
    Ok(())
}
