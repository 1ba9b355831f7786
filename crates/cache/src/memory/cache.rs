//! 进程内 CachePort 实现
//!
//! 语义对齐 Redis：键级 TTL、位图、集合、地理索引（WITHDIST 距离按 Redis 的地球半径计算）

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use review_errors::{AppError, AppResult};
use review_ports::{CachePort, GeoHit, GeoPoint};

/// Redis GEO 命令使用的地球半径（米）
const EARTH_RADIUS_METERS: f64 = 6_372_797.560_856;

#[derive(Debug, Clone)]
enum Value {
    Text(String),
    Bits(Vec<u8>),
    Set(BTreeSet<String>),
    Geo(Vec<(String, GeoPoint)>),
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn persistent(value: Value) -> Self {
        Self {
            value,
            expires_at: None,
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// 进程内缓存
#[derive(Debug, Default)]
pub struct InMemoryCache {
    entries: Mutex<HashMap<String, Entry>>,
    get_calls: AtomicU64,
}

fn wrong_type(key: &str) -> AppError {
    AppError::internal(format!(
        "WRONGTYPE Operation against key '{}' holding the wrong kind of value",
        key
    ))
}

/// 两点间的球面距离（米）
pub fn haversine_meters(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let d_lat = lat2 - lat1;
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_METERS * h.sqrt().asin()
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// `get` 被调用的次数
    pub fn get_calls(&self) -> u64 {
        self.get_calls.load(Ordering::SeqCst)
    }

    /// 剩余 TTL，键不存在或不过期时返回 None
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        let entries = self.entries.lock();
        entries
            .get(key)
            .filter(|entry| !entry.is_expired(now))
            .and_then(|entry| entry.expires_at)
            .map(|at| at.saturating_duration_since(now))
    }

    /// 清空所有键
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    fn with_live_entries<R>(&self, f: impl FnOnce(&mut HashMap<String, Entry>) -> R) -> R {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        entries.retain(|_, entry| !entry.is_expired(now));
        f(&mut entries)
    }
}

#[async_trait]
impl CachePort for InMemoryCache {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        self.with_live_entries(|entries| match entries.get(key) {
            None => Ok(None),
            Some(Entry {
                value: Value::Text(text),
                ..
            }) => Ok(Some(text.clone())),
            Some(_) => Err(wrong_type(key)),
        })
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> AppResult<()> {
        let expires_at = ttl.map(|ttl| Instant::now() + ttl);
        self.with_live_entries(|entries| {
            entries.insert(
                key.to_string(),
                Entry {
                    value: Value::Text(value.to_string()),
                    expires_at,
                },
            );
        });
        Ok(())
    }

    async fn set_nx(&self, key: &str, value: &str, ttl: Duration) -> AppResult<bool> {
        let expires_at = Some(Instant::now() + ttl);
        Ok(self.with_live_entries(|entries| {
            if entries.contains_key(key) {
                return false;
            }
            entries.insert(
                key.to_string(),
                Entry {
                    value: Value::Text(value.to_string()),
                    expires_at,
                },
            );
            true
        }))
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.with_live_entries(|entries| {
            entries.remove(key);
        });
        Ok(())
    }

    async fn delete_if_equals(&self, key: &str, expected_value: &str) -> AppResult<bool> {
        Ok(self.with_live_entries(|entries| {
            let matches = matches!(
                entries.get(key),
                Some(Entry { value: Value::Text(text), .. }) if text == expected_value
            );
            if matches {
                entries.remove(key);
            }
            matches
        }))
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        Ok(self.with_live_entries(|entries| entries.contains_key(key)))
    }

    async fn expire(&self, key: &str, ttl: Duration) -> AppResult<()> {
        let expires_at = Some(Instant::now() + ttl);
        self.with_live_entries(|entries| {
            if let Some(entry) = entries.get_mut(key) {
                entry.expires_at = expires_at;
            }
        });
        Ok(())
    }

    async fn incr(&self, key: &str) -> AppResult<i64> {
        self.with_live_entries(|entries| {
            let entry = entries
                .entry(key.to_string())
                .or_insert_with(|| Entry::persistent(Value::Text("0".to_string())));
            let Value::Text(text) = &mut entry.value else {
                return Err(wrong_type(key));
            };
            let current: i64 = text.parse().map_err(|_| {
                AppError::internal("ERR value is not an integer or out of range")
            })?;
            let next = current + 1;
            *text = next.to_string();
            Ok(next)
        })
    }

    async fn get_bit(&self, key: &str, offset: u64) -> AppResult<bool> {
        self.with_live_entries(|entries| match entries.get(key) {
            None => Ok(false),
            Some(Entry {
                value: Value::Bits(bytes),
                ..
            }) => {
                let byte = bytes.get((offset / 8) as usize).copied().unwrap_or(0);
                Ok(byte & (0x80 >> (offset % 8)) != 0)
            }
            Some(_) => Err(wrong_type(key)),
        })
    }

    async fn set_bit(&self, key: &str, offset: u64, value: bool) -> AppResult<bool> {
        self.with_live_entries(|entries| {
            let entry = entries
                .entry(key.to_string())
                .or_insert_with(|| Entry::persistent(Value::Bits(Vec::new())));
            let Value::Bits(bytes) = &mut entry.value else {
                return Err(wrong_type(key));
            };

            let index = (offset / 8) as usize;
            if bytes.len() <= index {
                bytes.resize(index + 1, 0);
            }
            let mask = 0x80u8 >> (offset % 8);
            let previous = bytes[index] & mask != 0;
            if value {
                bytes[index] |= mask;
            } else {
                bytes[index] &= !mask;
            }
            Ok(previous)
        })
    }

    async fn bitfield_get_unsigned(&self, key: &str, bits: u8, offset: u64) -> AppResult<u64> {
        if bits == 0 || bits > 63 {
            return Err(AppError::validation(format!(
                "Unsigned bitfield width must be within 1..=63, got {}",
                bits
            )));
        }

        let mut result = 0u64;
        for position in offset..offset + u64::from(bits) {
            let bit = self.get_bit(key, position).await?;
            result = (result << 1) | u64::from(bit);
        }
        Ok(result)
    }

    async fn geo_add(&self, key: &str, member: &str, point: GeoPoint) -> AppResult<()> {
        self.with_live_entries(|entries| {
            let entry = entries
                .entry(key.to_string())
                .or_insert_with(|| Entry::persistent(Value::Geo(Vec::new())));
            let Value::Geo(points) = &mut entry.value else {
                return Err(wrong_type(key));
            };
            match points.iter_mut().find(|(name, _)| name == member) {
                Some((_, existing)) => *existing = point,
                None => points.push((member.to_string(), point)),
            }
            Ok(())
        })
    }

    async fn geo_search(
        &self,
        key: &str,
        origin: GeoPoint,
        radius_meters: f64,
        limit: usize,
    ) -> AppResult<Vec<GeoHit>> {
        self.with_live_entries(|entries| {
            let points = match entries.get(key) {
                None => return Ok(Vec::new()),
                Some(Entry {
                    value: Value::Geo(points),
                    ..
                }) => points,
                Some(_) => return Err(wrong_type(key)),
            };

            let mut hits: Vec<GeoHit> = points
                .iter()
                .map(|(member, point)| GeoHit {
                    member: member.clone(),
                    distance_meters: haversine_meters(origin, *point),
                })
                .filter(|hit| hit.distance_meters <= radius_meters)
                .collect();
            hits.sort_by(|a, b| a.distance_meters.total_cmp(&b.distance_meters));
            hits.truncate(limit);
            Ok(hits)
        })
    }

    async fn set_add(&self, key: &str, member: &str) -> AppResult<bool> {
        self.with_live_entries(|entries| {
            let entry = entries
                .entry(key.to_string())
                .or_insert_with(|| Entry::persistent(Value::Set(BTreeSet::new())));
            match &mut entry.value {
                Value::Set(members) => Ok(members.insert(member.to_string())),
                _ => Err(wrong_type(key)),
            }
        })
    }

    async fn set_remove(&self, key: &str, member: &str) -> AppResult<bool> {
        self.with_live_entries(|entries| {
            let Some(entry) = entries.get_mut(key) else {
                return Ok(false);
            };
            let Value::Set(members) = &mut entry.value else {
                return Err(wrong_type(key));
            };
            let removed = members.remove(member);
            if members.is_empty() {
                entries.remove(key);
            }
            Ok(removed)
        })
    }

    async fn set_intersect(&self, keys: &[&str]) -> AppResult<Vec<String>> {
        self.with_live_entries(|entries| {
            let mut result: Option<BTreeSet<String>> = None;
            for key in keys {
                let members = match entries.get(*key) {
                    None => return Ok(Vec::new()),
                    Some(Entry {
                        value: Value::Set(members),
                        ..
                    }) => members,
                    Some(_) => return Err(wrong_type(key)),
                };
                result = Some(match result {
                    None => members.clone(),
                    Some(acc) => acc.intersection(members).cloned().collect(),
                });
            }
            Ok(result.map(|set| set.into_iter().collect()).unwrap_or_default())
        })
    }
}
