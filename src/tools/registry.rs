//! 可信机构名单
//!
//! 资源记录只是「声明」了验证机构，只有名单内的机构才算已验证。

use std::collections::HashSet;
use std::path::Path;

use crate::core::ReliefError;

/// 可信机构查询接口
pub trait OrganizationRegistry: Send + Sync {
    fn is_trusted(&self, organization: &str) -> bool;
}

/// 可信机构集合（精确匹配）
#[derive(Debug, Clone, Default)]
pub struct TrustedOrganizations {
    organizations: HashSet<String>,
}

impl TrustedOrganizations {
    pub fn new<I, S>(organizations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            organizations: organizations.into_iter().map(Into::into).collect(),
        }
    }

    /// 从 JSON 数组文件加载，如 `["Red Cross", "FEMA"]`
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ReliefError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let names: Vec<String> = serde_json::from_str(&content)?;
        tracing::info!(path = %path.display(), count = names.len(), "Loaded trusted organizations");
        Ok(Self::new(names))
    }

    pub fn len(&self) -> usize {
        self.organizations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.organizations.is_empty()
    }
}

impl OrganizationRegistry for TrustedOrganizations {
    fn is_trusted(&self, organization: &str) -> bool {
        self.organizations.contains(organization)
    }
}
