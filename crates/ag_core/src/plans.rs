use serde::Serialize;
use crate::types::PlanType;

/// Immutable catalogue entry for a content plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Plan {
    #[serde(rename = "type")]
    pub plan_type: PlanType,
    pub name: &'static str,
    pub description: &'static str,
}

static PLANS: [Plan; 4] = [
    Plan {
        plan_type: PlanType::Normal,
        name: "普通プラン",
        description: "【オウンドメディア向け】Web上の最新情報を参照し、読者に価値を提供するSEO記事を生成します。",
    },
    Plan {
        plan_type: PlanType::Expert,
        name: "専門プラン",
        description: "【オウンドメディア向け】専門資料に基づき、権威性と信頼性の高い解説記事を生成します。",
    },
    Plan {
        plan_type: PlanType::Affiliate,
        name: "アフィリエイト記事プラン",
        description: "商品の魅力を伝え、読者の購買意欲を高めるレビュー記事や比較記事を生成します。",
    },
    Plan {
        plan_type: PlanType::ForeignLanguage,
        name: "外国語プラン",
        description: "英語、中国語、韓国語でオウンドメディア向けの記事を生成します。",
    },
];

pub fn plans() -> &'static [Plan] {
    &PLANS
}

impl PlanType {
    pub fn plan(&self) -> &'static Plan {
        match self {
            PlanType::Normal => &PLANS[0],
            PlanType::Expert => &PLANS[1],
            PlanType::Affiliate => &PLANS[2],
            PlanType::ForeignLanguage => &PLANS[3],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalogue_lookup_matches_type() {
        for plan in plans() {
            assert_eq!(plan.plan_type.plan(), plan);
        }
        assert_eq!(plans().len(), 4);
    }
}
