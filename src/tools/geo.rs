//! 已知地点表与大圆距离
//!
//! Planner 的地点识别和 Worker 的地理编码共用同一张表；表外的名称一律不给坐标。

use serde::{Deserialize, Serialize};

/// 地球平均半径（km）
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// 经纬度（十进制度）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// 带名称的地点（配置 [[locations]] 的一项）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedLocation {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

impl NamedLocation {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.lat, self.lon)
    }
}

/// 已知地点表：名称大小写不敏感，保留首次登记时的写法用于展示
#[derive(Debug, Clone)]
pub struct KnownLocations {
    entries: Vec<NamedLocation>,
}

impl KnownLocations {
    /// 空表
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// 内置表：目前只有 Springfield
    pub fn builtin() -> Self {
        let mut table = Self::empty();
        table.insert(NamedLocation {
            name: "Springfield".to_string(),
            lat: 40.7128,
            lon: -74.0060,
        });
        table
    }

    /// 内置表加上配置里的额外地点；同名时配置覆盖内置坐标
    pub fn with_extra(extra: impl IntoIterator<Item = NamedLocation>) -> Self {
        let mut table = Self::builtin();
        for loc in extra {
            table.insert(loc);
        }
        table
    }

    pub fn insert(&mut self, location: NamedLocation) {
        match self
            .entries
            .iter_mut()
            .find(|e| e.name.eq_ignore_ascii_case(&location.name))
        {
            Some(existing) => {
                existing.lat = location.lat;
                existing.lon = location.lon;
            }
            None => self.entries.push(location),
        }
    }

    /// 按名称精确查找（忽略大小写）
    pub fn lookup(&self, name: &str) -> Option<&NamedLocation> {
        let name = name.trim();
        self.entries.iter().find(|e| e.name.eq_ignore_ascii_case(name))
    }

    /// 在自由文本中找第一个出现的已知地名（子串匹配，忽略大小写）
    pub fn find_in(&self, text: &str) -> Option<&NamedLocation> {
        let lowered = text.to_lowercase();
        self.entries
            .iter()
            .find(|e| lowered.contains(&e.name.to_lowercase()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for KnownLocations {
    fn default() -> Self {
        Self::builtin()
    }
}

/// haversine 大圆距离（km）
pub fn haversine_km(a: Coordinates, b: Coordinates) -> f64 {
    let phi1 = a.lat.to_radians();
    let phi2 = b.lat.to_radians();
    let dphi = (b.lat - a.lat).to_radians();
    let dlambda = (b.lon - a.lon).to_radians();

    let h = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_KM * c
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_springfield_lookup_is_case_insensitive() {
        let table = KnownLocations::builtin();
        let loc = table.lookup("SPRINGFIELD").unwrap();
        assert_eq!(loc.name, "Springfield");
        assert!((loc.lat - 40.7128).abs() < 1e-9);
        assert!((loc.lon + 74.0060).abs() < 1e-9);
        assert!(table.lookup("Atlantis").is_none());
    }

    #[test]
    fn test_find_in_free_text() {
        let table = KnownLocations::with_extra(vec![NamedLocation {
            name: "Shelbyville".to_string(),
            lat: 39.4,
            lon: -85.7,
        }]);
        assert_eq!(
            table.find_in("any food left in shelbyville?").unwrap().name,
            "Shelbyville"
        );
        assert!(table.find_in("somewhere else entirely").is_none());
    }

    #[test]
    fn test_extra_entry_overrides_builtin_coordinates() {
        let table = KnownLocations::with_extra(vec![NamedLocation {
            name: "springfield".to_string(),
            lat: 39.78,
            lon: -89.65,
        }]);
        assert_eq!(table.len(), 1);
        let loc = table.lookup("Springfield").unwrap();
        assert_eq!(loc.name, "Springfield");
        assert!((loc.lat - 39.78).abs() < 1e-9);
    }

    #[test]
    fn test_haversine_zero_and_known_distance() {
        let nyc = Coordinates::new(40.7128, -74.0060);
        assert!(haversine_km(nyc, nyc).abs() < 1e-9);

        // 纬度相差 1 度 ≈ 111.19 km
        let north = Coordinates::new(41.7128, -74.0060);
        let d = haversine_km(nyc, north);
        assert!((d - 111.19).abs() < 0.1, "got {d}");
    }
}
