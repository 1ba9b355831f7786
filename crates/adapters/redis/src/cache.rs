//! Redis Cache 实现

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, RedisError, Script};
use review_errors::{AppError, AppResult};
use review_ports::{CachePort, GeoHit, GeoPoint};
use std::time::Duration;

/// Redis Cache
#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager,
}

fn redis_error(operation: &'static str) -> impl FnOnce(RedisError) -> AppError {
    move |e| AppError::internal(format!("Redis {} failed: {}", operation, e))
}

/// 毫秒级 TTL，至少 1ms，避免 PX 0 被 Redis 拒绝
fn ttl_millis(ttl: Duration) -> u64 {
    (ttl.as_millis() as u64).max(1)
}

impl RedisCache {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    pub fn connection(&self) -> ConnectionManager {
        self.conn.clone()
    }
}

#[async_trait]
impl CachePort for RedisCache {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let mut conn = self.conn.clone();
        conn.get(key).await.map_err(redis_error("get"))
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> AppResult<()> {
        let mut conn = self.conn.clone();
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value);
        if let Some(ttl) = ttl {
            cmd.arg("PX").arg(ttl_millis(ttl));
        }
        cmd.query_async::<()>(&mut conn)
            .await
            .map_err(redis_error("set"))
    }

    async fn set_nx(&self, key: &str, value: &str, ttl: Duration) -> AppResult<bool> {
        let mut conn = self.conn.clone();

        // SET NX PX 原子性地设置键和过期时间，已存在时返回 nil
        let result: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("PX")
            .arg(ttl_millis(ttl))
            .query_async(&mut conn)
            .await
            .map_err(redis_error("set_nx"))?;

        Ok(result.is_some())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        let mut conn = self.conn.clone();
        conn.del(key).await.map_err(redis_error("delete"))
    }

    async fn delete_if_equals(&self, key: &str, expected_value: &str) -> AppResult<bool> {
        let mut conn = self.conn.clone();

        let script = Script::new(
            r"
            if redis.call('GET', KEYS[1]) == ARGV[1] then
                return redis.call('DEL', KEYS[1])
            else
                return 0
            end
            ",
        );

        let deleted: i64 = script
            .key(key)
            .arg(expected_value)
            .invoke_async(&mut conn)
            .await
            .map_err(redis_error("delete_if_equals"))?;

        Ok(deleted > 0)
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        let mut conn = self.conn.clone();
        conn.exists(key).await.map_err(redis_error("exists"))
    }

    async fn expire(&self, key: &str, ttl: Duration) -> AppResult<()> {
        let mut conn = self.conn.clone();
        redis::cmd("PEXPIRE")
            .arg(key)
            .arg(ttl_millis(ttl))
            .query_async::<()>(&mut conn)
            .await
            .map_err(redis_error("expire"))
    }

    async fn incr(&self, key: &str) -> AppResult<i64> {
        let mut conn = self.conn.clone();
        conn.incr(key, 1_i64).await.map_err(redis_error("incr"))
    }

    async fn get_bit(&self, key: &str, offset: u64) -> AppResult<bool> {
        let mut conn = self.conn.clone();
        let bit: u8 = redis::cmd("GETBIT")
            .arg(key)
            .arg(offset)
            .query_async(&mut conn)
            .await
            .map_err(redis_error("getbit"))?;
        Ok(bit == 1)
    }

    async fn set_bit(&self, key: &str, offset: u64, value: bool) -> AppResult<bool> {
        let mut conn = self.conn.clone();
        let previous: u8 = redis::cmd("SETBIT")
            .arg(key)
            .arg(offset)
            .arg(u8::from(value))
            .query_async(&mut conn)
            .await
            .map_err(redis_error("setbit"))?;
        Ok(previous == 1)
    }

    async fn bitfield_get_unsigned(&self, key: &str, bits: u8, offset: u64) -> AppResult<u64> {
        if bits == 0 || bits > 63 {
            return Err(AppError::validation(format!(
                "Unsigned bitfield width must be within 1..=63, got {}",
                bits
            )));
        }

        let mut conn = self.conn.clone();
        let values: Vec<Option<u64>> = redis::cmd("BITFIELD")
            .arg(key)
            .arg("GET")
            .arg(format!("u{}", bits))
            .arg(offset)
            .query_async(&mut conn)
            .await
            .map_err(redis_error("bitfield"))?;

        Ok(values.into_iter().next().flatten().unwrap_or(0))
    }

    async fn geo_add(&self, key: &str, member: &str, point: GeoPoint) -> AppResult<()> {
        let mut conn = self.conn.clone();
        redis::cmd("GEOADD")
            .arg(key)
            .arg(point.longitude)
            .arg(point.latitude)
            .arg(member)
            .query_async::<()>(&mut conn)
            .await
            .map_err(redis_error("geoadd"))
    }

    async fn geo_search(
        &self,
        key: &str,
        origin: GeoPoint,
        radius_meters: f64,
        limit: usize,
    ) -> AppResult<Vec<GeoHit>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let mut conn = self.conn.clone();
        let rows: Vec<(String, String)> = redis::cmd("GEOSEARCH")
            .arg(key)
            .arg("FROMLONLAT")
            .arg(origin.longitude)
            .arg(origin.latitude)
            .arg("BYRADIUS")
            .arg(radius_meters)
            .arg("m")
            .arg("ASC")
            .arg("COUNT")
            .arg(limit)
            .arg("WITHDIST")
            .query_async(&mut conn)
            .await
            .map_err(redis_error("geosearch"))?;

        rows.into_iter()
            .map(|(member, distance)| {
                let distance_meters = distance.parse::<f64>().map_err(|e| {
                    AppError::internal(format!(
                        "Redis geosearch returned invalid distance '{}': {}",
                        distance, e
                    ))
                })?;
                Ok(GeoHit {
                    member,
                    distance_meters,
                })
            })
            .collect()
    }

    async fn set_add(&self, key: &str, member: &str) -> AppResult<bool> {
        let mut conn = self.conn.clone();
        let added: i64 = conn.sadd(key, member).await.map_err(redis_error("sadd"))?;
        Ok(added > 0)
    }

    async fn set_remove(&self, key: &str, member: &str) -> AppResult<bool> {
        let mut conn = self.conn.clone();
        let removed: i64 = conn.srem(key, member).await.map_err(redis_error("srem"))?;
        Ok(removed > 0)
    }

    async fn set_intersect(&self, keys: &[&str]) -> AppResult<Vec<String>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.conn.clone();
        conn.sinter(keys).await.map_err(redis_error("sinter"))
    }
}
