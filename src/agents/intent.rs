//! 意图识别
//!
//! 固定五类意图，每类有关键词表和风险优先级（数字越小越紧急）。
//! 得分 = 小写文本中出现的关键词个数；取 (得分, -优先级) 最大者，全为 0 时归为 info。

use serde::{Deserialize, Serialize};

/// 请求意图
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Medical,
    Evacuation,
    Shelter,
    Food,
    Info,
}

impl Intent {
    pub const ALL: [Intent; 5] = [
        Intent::Medical,
        Intent::Evacuation,
        Intent::Shelter,
        Intent::Food,
        Intent::Info,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Intent::Medical => "medical",
            Intent::Evacuation => "evacuation",
            Intent::Shelter => "shelter",
            Intent::Food => "food",
            Intent::Info => "info",
        }
    }

    /// 关键词表（子串匹配，已是小写）
    pub fn keywords(self) -> &'static [&'static str] {
        match self {
            Intent::Medical => &["medical", "hospital", "injury", "sick", "triage"],
            Intent::Evacuation => &["evacuate", "evacuation", "route", "exit"],
            Intent::Shelter => &["shelter", "safe", "housing", "stay"],
            Intent::Food => &["food", "meal", "eat", "distribution"],
            Intent::Info => &["info", "information", "help"],
        }
    }

    /// 风险优先级：medical=1 … info=5
    pub fn priority(self) -> u8 {
        match self {
            Intent::Medical => 1,
            Intent::Evacuation => 2,
            Intent::Shelter => 3,
            Intent::Food => 4,
            Intent::Info => 5,
        }
    }

    /// 在已小写的文本中命中的关键词个数
    pub fn score(self, lowered: &str) -> usize {
        self.keywords()
            .iter()
            .filter(|kw| lowered.contains(*kw))
            .count()
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 对自由文本做意图分类
pub fn classify_intent(text: &str) -> Intent {
    let lowered = text.to_lowercase();

    let (best, best_score) = Intent::ALL
        .iter()
        .map(|&intent| (intent, intent.score(&lowered)))
        .fold((Intent::Info, 0usize), |(best, best_score), (intent, score)| {
            let better = score > best_score
                || (score == best_score && intent.priority() < best.priority());
            if better {
                (intent, score)
            } else {
                (best, best_score)
            }
        });

    if best_score == 0 {
        Intent::Info
    } else {
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_label_wins() {
        assert_eq!(classify_intent("I need a shelter in Springfield"), Intent::Shelter);
        assert_eq!(classify_intent("Where is the nearest HOSPITAL?"), Intent::Medical);
        assert_eq!(classify_intent("evacuation route please"), Intent::Evacuation);
    }

    #[test]
    fn test_tie_breaks_on_priority() {
        // medical 与 food 各命中 1 个关键词
        assert_eq!(classify_intent("sick and need food"), Intent::Medical);
        // shelter 与 food 各命中 1 个
        assert_eq!(classify_intent("shelter or a meal"), Intent::Shelter);
    }

    #[test]
    fn test_higher_score_beats_priority() {
        // food: food, meal, distribution = 3；medical: sick = 1
        assert_eq!(
            classify_intent("sick kid, any food distribution or meal nearby"),
            Intent::Food
        );
    }

    #[test]
    fn test_overlapping_keywords_both_count() {
        // "information" 同时命中 info 与 information
        assert_eq!(Intent::Info.score("information"), 2);
        assert_eq!(Intent::Evacuation.score("evacuation"), 1);
    }

    #[test]
    fn test_no_keywords_defaults_to_info() {
        assert_eq!(classify_intent("hello there"), Intent::Info);
        assert_eq!(classify_intent(""), Intent::Info);
    }

    #[test]
    fn test_result_is_always_in_label_set() {
        for text in ["", "x", "triage exit housing meal help", "SAFE STAY"] {
            assert!(Intent::ALL.contains(&classify_intent(text)));
        }
    }
}
