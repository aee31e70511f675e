//! Prompt construction for the text model.
//!
//! Both builders are pure: the same arguments always render the same string.
//! User input (keywords, audience, custom instructions, reference text) is
//! embedded verbatim.

mod templates;

pub use templates::{template_set, PromptLanguage, TemplateSet};

use ag_core::{GenerationConfig, Language, PlanType};

/// Literal token separating the article body from the meta description.
pub const META_SEPARATOR: &str = "---meta---";

const AFFILIATE_TITLE_ROLE: &str = "あなたはトップアフィリエイターです。以下の情報に基づいて、読者の好奇心と購買意欲を強く刺激する、クリックしたくなるようなアフィリエイト記事のタイトル案を10個生成してください。";

const EXPERT_REFERENCE_BLOCK: &str = "**最優先の知識ベース (添付資料):**\n以下の参考情報を最優先の知識ベースとして記事を生成してください:";

const EXPERT_OUTPUT_FORMAT: &str = r#"**出力形式:**
記事本文（マークダウン形式）とメタディスクリプションを、必ず以下のJSON形式で出力してください。
{
  "article": "（ここに記事本文を記述）",
  "metaDescription": "（ここにメタディスクリプションを記述）"
}
"#;

/// Title-ideas prompt. `language` is only read for the ForeignLanguage plan.
pub fn build_title_prompt(plan: PlanType, keywords: &str, audience: &str, language: Language) -> String {
    let prompt_language = PromptLanguage::for_plan(plan, language);
    let t = template_set(prompt_language);
    let info = format!(
        "{}: {}\n{}: {}",
        t.keywords_label, keywords, t.audience_label, audience
    );

    match plan {
        PlanType::Affiliate => format!("{}\n\n{}", AFFILIATE_TITLE_ROLE, info),
        PlanType::ForeignLanguage => format!("{}\n\n{}\n\n{}", t.title_role, info, t.title_language_rule),
        PlanType::Normal | PlanType::Expert => format!("{}\n\n{}", t.title_role, info),
    }
}

/// Inputs for an article prompt besides the structural config.
#[derive(Debug, Clone, Copy)]
pub struct ArticleBrief<'a> {
    pub title: &'a str,
    pub keywords: &'a str,
    pub audience: &'a str,
    pub plan: PlanType,
    pub urls: &'a [String],
    pub reference_text: &'a str,
}

pub fn build_article_prompt(brief: &ArticleBrief<'_>, config: &GenerationConfig) -> String {
    let prompt_language = PromptLanguage::for_plan(brief.plan, config.language);
    let t = template_set(prompt_language);

    let role = match brief.plan {
        PlanType::Affiliate => t.affiliate_role,
        PlanType::Normal | PlanType::Expert | PlanType::ForeignLanguage => t.owned_media_role,
    };

    let mut prompt = String::with_capacity(2048);
    prompt.push_str(role);
    prompt.push_str("\n\n");

    prompt.push_str(&format!("**{}:**\n", t.basic_info_heading));
    prompt.push_str(&format!("- **{}:** {}\n", t.article_title_label, brief.title));
    prompt.push_str(&format!("- **{}:** {}\n", t.keywords_label, brief.keywords));
    prompt.push_str(&format!("- **{}:** {}\n", t.audience_label, brief.audience));

    let urls: Vec<&str> = brief
        .urls
        .iter()
        .map(|url| url.trim())
        .filter(|url| !url.is_empty())
        .collect();
    if !urls.is_empty() {
        prompt.push_str(&format!("\n**{}:**\n{}:\n", t.urls_heading, t.urls_intro));
        for url in urls {
            prompt.push_str(&format!("- {}\n", url));
        }
    }

    prompt.push_str(&format!("\n**{}:**\n", t.requirements_heading));
    let requirements = [
        (t.structure)(config.h2_count, config.h3_count),
        (t.length)(config.chars_per_heading),
        (t.seo)(brief.keywords),
        (t.quality)(config.tone, (t.tone_description)(config.tone)),
        t.meta.to_string(),
    ];
    for line in requirements {
        prompt.push_str(&line);
        prompt.push('\n');
    }
    if !config.custom_prompt.trim().is_empty() {
        prompt.push_str(&(t.custom)(&config.custom_prompt));
        prompt.push('\n');
    }
    if !t.article_language_rule.is_empty() {
        prompt.push('\n');
        prompt.push_str(t.article_language_rule);
        prompt.push('\n');
    }

    if brief.plan.uses_structured_output() {
        if !brief.reference_text.trim().is_empty() {
            prompt.push('\n');
            prompt.push_str(EXPERT_REFERENCE_BLOCK);
            prompt.push_str("\n---\n");
            prompt.push_str(brief.reference_text);
            prompt.push_str("\n---\n");
        }
        prompt.push('\n');
        prompt.push_str(EXPERT_OUTPUT_FORMAT);
    } else {
        prompt.push('\n');
        prompt.push_str(t.grounded_output);
    }

    prompt
}

/// Placeholder used when the model omits the meta description.
pub fn meta_fallback(plan: PlanType, language: Language) -> &'static str {
    template_set(PromptLanguage::for_plan(plan, language)).meta_fallback
}

#[cfg(test)]
mod tests {
    use super::*;
    use ag_core::Tone;

    const LANGUAGES: [Language; 4] = [Language::English, Language::Mandarin, Language::Cantonese, Language::Korean];

    fn brief<'a>(plan: PlanType, urls: &'a [String], reference_text: &'a str) -> ArticleBrief<'a> {
        ArticleBrief {
            title: "確定申告の基本",
            keywords: "確定申告 やり方",
            audience: "個人事業主",
            plan,
            urls,
            reference_text,
        }
    }

    #[test]
    fn test_title_prompt_ignores_language_outside_foreign_plan() {
        for plan in [PlanType::Normal, PlanType::Expert, PlanType::Affiliate] {
            let english = build_title_prompt(plan, "tax filing", "freelancers", Language::English);
            for language in LANGUAGES {
                assert_eq!(build_title_prompt(plan, "tax filing", "freelancers", language), english);
            }
        }
    }

    #[test]
    fn test_title_prompt_embeds_input_verbatim() {
        let prompt = build_title_prompt(PlanType::Normal, "<b>tax</b> & \"filing\"", "", Language::English);
        assert!(prompt.contains("キーワード: <b>tax</b> & \"filing\""));
        assert!(prompt.ends_with("ターゲット読者: "));
    }

    #[test]
    fn test_affiliate_title_prompt_uses_persuasive_template() {
        let prompt = build_title_prompt(PlanType::Affiliate, "ワイヤレスイヤホン", "通勤者", Language::Korean);
        assert!(prompt.starts_with(AFFILIATE_TITLE_ROLE));
        assert!(prompt.contains("キーワード: ワイヤレスイヤホン"));
    }

    #[test]
    fn test_foreign_title_prompt_demands_language() {
        let prompt = build_title_prompt(PlanType::ForeignLanguage, "tax filing", "freelancers", Language::English);
        assert!(prompt.contains("Keywords: tax filing\nTarget Audience: freelancers"));
        assert!(prompt.ends_with("must be written exclusively in English."));

        let prompt = build_title_prompt(PlanType::ForeignLanguage, "세금", "프리랜서", Language::Korean);
        assert!(prompt.contains("키워드: 세금"));
        assert!(prompt.contains("한국어로만"));
    }

    #[test]
    fn test_foreign_article_prompt_names_exactly_one_language() {
        let rules: Vec<&str> = LANGUAGES
            .iter()
            .map(|l| template_set(PromptLanguage::Foreign(*l)).article_language_rule)
            .collect();
        for (i, language) in LANGUAGES.iter().enumerate() {
            let config = GenerationConfig { language: *language, ..GenerationConfig::default() };
            let prompt = build_article_prompt(&brief(PlanType::ForeignLanguage, &[], ""), &config);
            for (j, rule) in rules.iter().enumerate() {
                assert_eq!(prompt.contains(rule), i == j, "language {:?} rule {}", language, j);
            }
        }
    }

    #[test]
    fn test_article_prompt_structure_requirements() {
        let config = GenerationConfig { h2_count: 3, h3_count: 2, ..GenerationConfig::default() };
        let prompt = build_article_prompt(&brief(PlanType::Normal, &[], ""), &config);
        assert!(prompt.contains("H2見出しを**正確に3個**使用し、各H2下にはH3見出しを**最大2個まで**使用してください。"));
        assert!(prompt.contains("**約400文字**"));

        let config = GenerationConfig { h2_count: 3, h3_count: 2, language: Language::English, ..GenerationConfig::default() };
        let prompt = build_article_prompt(&brief(PlanType::ForeignLanguage, &[], ""), &config);
        assert!(prompt.contains("**exactly 3 H2 headings**, with up to **2 H3 headings** under each H2"));
    }

    #[test]
    fn test_article_prompt_registers() {
        let config = GenerationConfig::default();
        let affiliate = build_article_prompt(&brief(PlanType::Affiliate, &[], ""), &config);
        assert!(affiliate.starts_with(template_set(PromptLanguage::Japanese).affiliate_role));
        let normal = build_article_prompt(&brief(PlanType::Normal, &[], ""), &config);
        assert!(normal.starts_with(template_set(PromptLanguage::Japanese).owned_media_role));
    }

    #[test]
    fn test_article_prompt_tone_and_custom_instruction() {
        let config = GenerationConfig {
            tone: Tone::Formal,
            custom_prompt: "専門用語には注釈を付ける".to_string(),
            ..GenerationConfig::default()
        };
        let prompt = build_article_prompt(&brief(PlanType::Normal, &[], ""), &config);
        assert!(prompt.contains("「Formal」（専門的で権威があり"));
        assert!(prompt.contains("- **追加の指示:** 専門用語には注釈を付ける"));

        let prompt = build_article_prompt(&brief(PlanType::Normal, &[], ""), &GenerationConfig::default());
        assert!(!prompt.contains("追加の指示"));
    }

    #[test]
    fn test_article_prompt_reference_urls() {
        let urls = vec!["  https://example.com/a ".to_string(), "".to_string(), "https://example.com/b".to_string()];
        let prompt = build_article_prompt(&brief(PlanType::Normal, &urls, ""), &GenerationConfig::default());
        assert!(prompt.contains("**最優先の参照URL:**"));
        assert!(prompt.contains("- https://example.com/a\n- https://example.com/b\n"));
        let urls_at = prompt.find("最優先の参照URL").unwrap();
        let requirements_at = prompt.find("共通の厳守要件").unwrap();
        assert!(urls_at < requirements_at);

        let prompt = build_article_prompt(&brief(PlanType::Normal, &[], ""), &GenerationConfig::default());
        assert!(!prompt.contains("最優先の参照URL"));
    }

    #[test]
    fn test_grounded_plans_request_separator() {
        for plan in [PlanType::Normal, PlanType::Affiliate, PlanType::ForeignLanguage] {
            let prompt = build_article_prompt(&brief(plan, &[], ""), &GenerationConfig::default());
            assert!(prompt.contains(META_SEPARATOR), "{:?}", plan);
            assert!(!prompt.contains("\"metaDescription\""));
        }
    }

    #[test]
    fn test_expert_prompt_uses_reference_text_and_json_format() {
        let prompt = build_article_prompt(
            &brief(PlanType::Expert, &[], "第3条 納税義務者は..."),
            &GenerationConfig::default(),
        );
        assert!(prompt.contains("最優先の知識ベース (添付資料)"));
        assert!(prompt.contains("---\n第3条 納税義務者は...\n---"));
        assert!(prompt.contains("\"metaDescription\""));
        assert!(!prompt.contains(META_SEPARATOR));

        let prompt = build_article_prompt(&brief(PlanType::Expert, &[], ""), &GenerationConfig::default());
        assert!(!prompt.contains("添付資料"));
    }

    #[test]
    fn test_meta_fallback_follows_prompt_language() {
        assert_eq!(meta_fallback(PlanType::Normal, Language::Korean), "メタディスクリプションの生成に失敗しました。");
        assert_eq!(meta_fallback(PlanType::ForeignLanguage, Language::English), "Failed to generate meta description.");
    }
}
