//! 资源库：只读的避难所 / 食物 / 医疗等资源记录
//!
//! 管线只通过 ResourceRepository::list_all 读取记录，不修改它们。
//! CsvResourceRepository 启动时一次性读入 CSV（列：name,address,type,lat,lon,verified_by,last_updated,notes）。

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::ReliefError;
use crate::tools::Coordinates;

/// 单条资源记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRecord {
    pub name: String,
    /// 为空表示数据源没有地址，Evaluator 会丢弃此类候选
    pub address: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    /// 声明的验证机构（是否可信由 OrganizationRegistry 判断）
    pub verified_by: Option<String>,
    /// ISO-8601 日期或日期时间，格式不合法时视为「不够新」
    pub last_updated: String,
    pub notes: String,
}

impl ResourceRecord {
    /// 经纬度都存在时才有坐标
    pub fn coordinates(&self) -> Option<Coordinates> {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => Some(Coordinates::new(lat, lon)),
            _ => None,
        }
    }

    pub fn has_address(&self) -> bool {
        !self.address.trim().is_empty()
    }
}

/// 资源库查询接口
pub trait ResourceRepository: Send + Sync {
    /// 返回全部记录
    fn list_all(&self) -> Vec<ResourceRecord>;
}

/// 内存资源库（测试或嵌入式使用）
#[derive(Debug, Clone, Default)]
pub struct InMemoryRepository {
    records: Vec<ResourceRecord>,
}

impl InMemoryRepository {
    pub fn new(records: Vec<ResourceRecord>) -> Self {
        Self { records }
    }
}

impl ResourceRepository for InMemoryRepository {
    fn list_all(&self) -> Vec<ResourceRecord> {
        self.records.clone()
    }
}

/// CSV 原始行：所有列先按字符串读，再统一归一化
#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(default)]
    name: String,
    #[serde(default)]
    address: String,
    #[serde(default, rename = "type")]
    kind: String,
    #[serde(default)]
    lat: String,
    #[serde(default)]
    lon: String,
    #[serde(default)]
    verified_by: String,
    #[serde(default)]
    last_updated: String,
    #[serde(default)]
    notes: String,
}

/// 从 CSV 文件加载的资源库
#[derive(Debug, Clone)]
pub struct CsvResourceRepository {
    records: Vec<ResourceRecord>,
}

impl CsvResourceRepository {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ReliefError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let records = Self::from_reader(file, &path.display().to_string())?;
        tracing::info!(path = %path.display(), count = records.len(), "Loaded resource records");
        Ok(Self { records })
    }

    fn from_reader<R: std::io::Read>(
        reader: R,
        source_name: &str,
    ) -> Result<Vec<ResourceRecord>, ReliefError> {
        let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let mut records = Vec::new();
        for row in rdr.deserialize::<CsvRow>() {
            records.push(normalize_row(row?, source_name)?);
        }
        Ok(records)
    }
}

impl ResourceRepository for CsvResourceRepository {
    fn list_all(&self) -> Vec<ResourceRecord> {
        self.records.clone()
    }
}

fn normalize_row(row: CsvRow, source_name: &str) -> Result<ResourceRecord, ReliefError> {
    Ok(ResourceRecord {
        lat: parse_coordinate(&row.lat, "lat", &row.name, source_name)?,
        lon: parse_coordinate(&row.lon, "lon", &row.name, source_name)?,
        verified_by: Some(row.verified_by).filter(|v| !v.is_empty()),
        name: row.name,
        address: row.address,
        resource_type: row.kind,
        last_updated: row.last_updated,
        notes: row.notes,
    })
}

fn parse_coordinate(
    raw: &str,
    column: &str,
    name: &str,
    source_name: &str,
) -> Result<Option<f64>, ReliefError> {
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<f64>()
        .map(Some)
        .map_err(|e| ReliefError::InvalidData {
            source_name: source_name.to_string(),
            detail: format!("{column} for {name:?}: {e}"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
name,address,type,lat,lon,verified_by,last_updated,notes
Central Shelter,12 Main St,shelter,40.71,-74.00,Red Cross,2025-01-10,Pets allowed
Pop-up Kitchen,,food,,,,not-a-date,
";

    #[test]
    fn test_csv_rows_are_normalized() {
        let records = CsvResourceRepository::from_reader(SAMPLE.as_bytes(), "sample").unwrap();
        assert_eq!(records.len(), 2);

        let shelter = &records[0];
        assert_eq!(shelter.resource_type, "shelter");
        assert_eq!(shelter.verified_by.as_deref(), Some("Red Cross"));
        assert!(shelter.coordinates().is_some());
        assert!(shelter.has_address());

        let kitchen = &records[1];
        assert_eq!(kitchen.lat, None);
        assert_eq!(kitchen.verified_by, None);
        assert!(kitchen.coordinates().is_none());
        assert!(!kitchen.has_address());
    }

    #[test]
    fn test_bad_coordinate_is_reported() {
        let bad = "name,address,type,lat,lon,verified_by,last_updated,notes\nX,1 Rd,food,north,1.0,,,\n";
        let err = CsvResourceRepository::from_reader(bad.as_bytes(), "bad.csv").unwrap_err();
        assert!(matches!(err, ReliefError::InvalidData { .. }));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shelters.csv");
        std::fs::write(&path, SAMPLE).unwrap();

        let repo = CsvResourceRepository::load(&path).unwrap();
        assert_eq!(repo.list_all().len(), 2);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = CsvResourceRepository::load("/definitely/not/here.csv").unwrap_err();
        assert!(matches!(err, ReliefError::Io(_)));
    }
}
