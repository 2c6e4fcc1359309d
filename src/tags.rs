//! Static policy-area classification.
//!
//! Each category carries a keyword list; an item is tagged with every
//! category that has at least one keyword in its title or snippet.

use crate::models::PlanTag;

pub struct PlanCategory {
    pub id: &'static str,
    pub name: &'static str,
    pub icon: &'static str,
    pub color: &'static str,
    pub keywords: &'static [&'static str],
}

impl PlanCategory {
    fn matches(&self, text: &str) -> bool {
        self.keywords.iter().any(|k| text.contains(k))
    }

    fn to_tag(&self) -> PlanTag {
        PlanTag {
            id: self.id.to_string(),
            name: self.name.to_string(),
            icon: self.icon.to_string(),
            color: self.color.to_string(),
        }
    }
}

pub static PLAN_CATEGORIES: &[PlanCategory] = &[
    PlanCategory {
        id: "innovation",
        name: "科技创新",
        icon: "🔬",
        color: "#3b82f6",
        keywords: &["科技", "创新", "人工智能", "芯片", "半导体", "量子", "研发"],
    },
    PlanCategory {
        id: "industry",
        name: "现代化产业体系",
        icon: "🏭",
        color: "#f59e0b",
        keywords: &["制造业", "新质生产力", "产业链", "数字经济", "工业"],
    },
    PlanCategory {
        id: "domestic-demand",
        name: "扩大内需",
        icon: "🛒",
        color: "#10b981",
        keywords: &["消费", "内需", "投资", "以旧换新", "市场"],
    },
    PlanCategory {
        id: "reform",
        name: "深化改革",
        icon: "⚙️",
        color: "#8b5cf6",
        keywords: &["改革", "营商环境", "民营经济", "国企", "统一大市场"],
    },
    PlanCategory {
        id: "opening-up",
        name: "高水平对外开放",
        icon: "🌏",
        color: "#06b6d4",
        keywords: &["开放", "外资", "自贸", "一带一路", "进出口", "贸易"],
    },
    PlanCategory {
        id: "rural",
        name: "乡村振兴",
        icon: "🌾",
        color: "#84cc16",
        keywords: &["乡村", "农业", "农村", "粮食", "三农"],
    },
    PlanCategory {
        id: "livelihood",
        name: "民生保障",
        icon: "🏥",
        color: "#ec4899",
        keywords: &["就业", "养老", "医疗", "教育", "社保", "住房", "民生"],
    },
    PlanCategory {
        id: "green",
        name: "绿色低碳",
        icon: "🌱",
        color: "#22c55e",
        keywords: &["绿色", "低碳", "碳达峰", "碳中和", "生态", "环保", "新能源"],
    },
    PlanCategory {
        id: "security",
        name: "国家安全",
        icon: "🛡️",
        color: "#dc2626",
        keywords: &["安全", "国防", "军队", "军事", "反恐"],
    },
    PlanCategory {
        id: "rule-of-law",
        name: "法治建设",
        icon: "⚖️",
        color: "#64748b",
        keywords: &["法治", "法律", "司法", "立法", "依法"],
    },
];

/// Tags for an item, in table order.
pub fn match_plan_tags(title: &str, snippet: &str) -> Vec<PlanTag> {
    PLAN_CATEGORIES
        .iter()
        .filter(|c| c.matches(title) || c.matches(snippet))
        .map(PlanCategory::to_tag)
        .collect()
}
