//! Per-language prompt fragments.
//!
//! Every supported language carries a full copy of each fragment; nothing is
//! translated at runtime. Adding a language means adding a `PromptLanguage`
//! variant, and the match in [`template_set`] refuses to compile until its
//! fragments exist.

use ag_core::{Language, PlanType, Tone};

/// The language a prompt is written in. Japanese is the tool's home language
/// and is used by every plan except ForeignLanguage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptLanguage {
    Japanese,
    Foreign(Language),
}

impl PromptLanguage {
    pub fn for_plan(plan: PlanType, language: Language) -> Self {
        match plan {
            PlanType::ForeignLanguage => PromptLanguage::Foreign(language),
            PlanType::Normal | PlanType::Expert | PlanType::Affiliate => PromptLanguage::Japanese,
        }
    }
}

pub struct TemplateSet {
    /// Opening instruction for owned-media title ideas.
    pub title_role: &'static str,
    pub keywords_label: &'static str,
    pub audience_label: &'static str,
    /// Appended to ForeignLanguage title prompts.
    pub title_language_rule: &'static str,

    pub affiliate_role: &'static str,
    pub owned_media_role: &'static str,
    pub basic_info_heading: &'static str,
    pub article_title_label: &'static str,
    pub urls_heading: &'static str,
    pub urls_intro: &'static str,
    pub requirements_heading: &'static str,
    pub structure: fn(u32, u32) -> String,
    pub length: fn(u32) -> String,
    pub seo: fn(&str) -> String,
    pub quality: fn(Tone, &str) -> String,
    pub meta: &'static str,
    pub custom: fn(&str) -> String,
    pub tone_description: fn(Tone) -> &'static str,
    /// Closing rule for article prompts; empty for the home language.
    pub article_language_rule: &'static str,
    pub grounded_output: &'static str,
    pub meta_fallback: &'static str,
}

pub fn template_set(language: PromptLanguage) -> &'static TemplateSet {
    match language {
        PromptLanguage::Japanese => &JAPANESE,
        PromptLanguage::Foreign(Language::English) => &ENGLISH,
        PromptLanguage::Foreign(Language::Mandarin) => &MANDARIN,
        PromptLanguage::Foreign(Language::Cantonese) => &CANTONESE,
        PromptLanguage::Foreign(Language::Korean) => &KOREAN,
    }
}

static JAPANESE: TemplateSet = TemplateSet {
    title_role: "あなたは企業のオウンドメディアを担当するコンテンツマーケターです。以下の情報に基づいて、読者の課題解決に繋がり、信頼性を感じさせるようなSEOに強いブログ記事のタイトル案を10個生成してください。",
    keywords_label: "キーワード",
    audience_label: "ターゲット読者",
    title_language_rule: "",
    affiliate_role: "あなたはトップアフィリエイターです。読者の心を動かし購入へ導く説得力の高い記事を生成してください。共感、ベネフィット訴求、信頼性構築、強力なCTAを重視してください。重要な部分は**太字**で強調してください。",
    owned_media_role: "あなたは経験豊富なコンテンツマーケターです。読者の信頼を獲得しブランド価値を高める高品質な情報記事を生成してください。中立性、客観性を保ち、直接的なセールストークは避けてください。重要な部分は**太字**で強調してください。",
    basic_info_heading: "記事作成のための基本情報",
    article_title_label: "記事タイトル",
    urls_heading: "最優先の参照URL",
    urls_intro: "以下のウェブサイトの情報を最優先の知識ベースとして記事を生成してください",
    requirements_heading: "共通の厳守要件",
    structure: |h2, h3| format!(
        "- **構成:** 導入、本文、まとめの構成を必ず含めてください。本文はH2見出しを**正確に{}個**使用し、各H2下にはH3見出しを**最大{}個まで**使用してください。",
        h2, h3
    ),
    length: |chars| format!("- **文字数:** 各H2セクションの本文は**約{}文字**に調整してください。", chars),
    seo: |keywords| format!("- **SEO:** キーワード（{}）を戦略的に配置してください。", keywords),
    quality: |tone, description| format!(
        "- **品質:** 文章のトーンは「{}」（{}）とし、段落は3〜4文で簡潔に、箇条書きも適宜使用してください。",
        tone, description
    ),
    meta: "- **メタディスクリプション:** **120文字程度**の魅力的なメタディスクリプションを生成してください。",
    custom: |custom| format!("- **追加の指示:** {}", custom),
    tone_description: |tone| match tone {
        Tone::Normal => "ですます調を基本とした、丁寧で分かりやすい通常の文章。",
        Tone::Casual => "読者との距離が近い、親しみやすいカジュアルな口語体の文章。",
        Tone::Formal => "専門的で権威があり、信頼性を重視したフォーマルで硬質な文章。",
    },
    article_language_rule: "",
    grounded_output: "信頼できる情報源を基に、正確で最新の情報を提供してください。\n\n**出力形式:**\nまず記事本文（マークダウン形式）を記述し、その後に必ず区切り線として「---meta---」を挿入し、最後にメタディスクリプションを記述してください。この形式を厳守してください。",
    meta_fallback: "メタディスクリプションの生成に失敗しました。",
};

static ENGLISH: TemplateSet = TemplateSet {
    title_role: "You are a content marketer for a corporate owned media. Based on the following information, generate 10 SEO-strong blog post title ideas that will help solve readers' problems and convey trustworthiness.",
    keywords_label: "Keywords",
    audience_label: "Target Audience",
    title_language_rule: "**Strict Instruction:** All title suggestions must be written exclusively in English.",
    affiliate_role: "You are a top affiliate marketer. Generate a highly persuasive article that moves the reader's heart and leads to purchase. Emphasize empathy, benefit appeal, building trust, and a strong CTA. Emphasize important parts with **bold text**.",
    owned_media_role: "You are an experienced content marketer. Generate a high-quality informational article that builds reader trust and enhances brand value. Maintain neutrality and objectivity, avoiding direct sales talk. Emphasize important parts with **bold text**.",
    basic_info_heading: "Basic Information for Article Creation",
    article_title_label: "Article Title",
    urls_heading: "Primary Reference URLs",
    urls_intro: "Generate the article using the information from the following websites as the primary knowledge base",
    requirements_heading: "Common Strict Requirements",
    structure: |h2, h3| format!(
        "- **Structure:** Must include an Introduction, Main Body, and Conclusion. The main body must use **exactly {} H2 headings**, with up to **{} H3 headings** under each H2.",
        h2, h3
    ),
    length: |chars| format!("- **Length:** Each H2 section's body text should be approximately **{} characters**.", chars),
    seo: |keywords| format!("- **SEO:** Strategically place the keywords ({}).", keywords),
    quality: |tone, description| format!(
        "- **Quality:** The tone should be \"{}\" ({}). Paragraphs should be 3-4 sentences. Use bullet points where appropriate.",
        tone, description
    ),
    meta: "- **Meta Description:** Generate a compelling meta description of about **120 characters**.",
    custom: |custom| format!("- **Additional Instructions:** {}", custom),
    tone_description: |tone| match tone {
        Tone::Normal => "A standard, polite, and easy-to-understand text.",
        Tone::Casual => "A friendly, casual, and colloquial text that feels close to the reader.",
        Tone::Formal => "A professional, authoritative, and formal text that emphasizes reliability.",
    },
    article_language_rule: "**Strict Instruction:** The entire output, including the article body and meta description, must be written exclusively in English.",
    grounded_output: "Provide accurate and up-to-date information based on reliable sources.\n\n**Output Format:**\nFirst, write the article body (in Markdown format), then insert \"---meta---\" as a separator, and finally, write the meta description. Strictly adhere to this format.",
    meta_fallback: "Failed to generate meta description.",
};

static MANDARIN: TemplateSet = TemplateSet {
    title_role: "您是一家企业自有媒体的内容营销人员。请根据以下信息，生成10个有助于解决读者问题并传达可信度的、具有强大SEO效果的博客文章标题建议。",
    keywords_label: "关键词",
    audience_label: "目标读者",
    title_language_rule: "**严格指示:** 所有标题建议必须完全用普通话（简体中文）撰写。",
    affiliate_role: "您是一位顶级的联盟营销人员。请撰写一篇具有高度说服力的文章，打动读者并引导其购买。请强调同理心、利益诉求、建立信任和强有力的号召性用语。请用**粗体**强调重要部分。",
    owned_media_role: "您是一位经验丰富的内容营销人员。请撰写一篇高质量的信息性文章，以建立读者信任并提升品牌价值。保持中立和客观，避免直接的销售宣传。用**粗体**强调重要部分。",
    basic_info_heading: "文章创作基本信息",
    article_title_label: "文章标题",
    urls_heading: "优先参考URL",
    urls_intro: "请使用以下网站信息作为首要知识库生成文章",
    requirements_heading: "共同严格要求",
    structure: |h2, h3| format!(
        "- **结构:** 必须包含引言、正文和结论。正文必须使用**恰好{}个H2标题**，每个H2下最多使用**{}个H3标题**。",
        h2, h3
    ),
    length: |chars| format!("- **字数:** 每个H2部分的正文长度约为**{}字**。", chars),
    seo: |keywords| format!("- **SEO:** 有策略地放置关键词 ({})。", keywords),
    quality: |tone, description| format!(
        "- **质量:** 文章语调应为“{}” ({})。段落应为3-4句。适当使用项目符号。",
        tone, description
    ),
    meta: "- **元描述:** 生成一个约**120字**的有吸引力的元描述。",
    custom: |custom| format!("- **附加说明:** {}", custom),
    tone_description: |tone| match tone {
        Tone::Normal => "礼貌、规范、易于理解的常规文章。",
        Tone::Casual => "与读者距离近、亲切随意的口语体文章。",
        Tone::Formal => "专业、权威、重视信赖性的正式书面文章。",
    },
    article_language_rule: "**严格指示:** 包括文章正文和元描述在内的所有输出内容，都必须完全用普通话（简体中文）撰写。",
    grounded_output: "请根据可靠来源提供准确和最新的信息。\n\n**输出格式:**\n首先，撰写文章正文（Markdown格式），然后插入“---meta---”作为分隔符，最后撰写元描述。请严格遵守此格式。",
    meta_fallback: "元描述生成失败。",
};

static CANTONESE: TemplateSet = TemplateSet {
    title_role: "你係一間企業自有媒體嘅內容營銷人員。請根據以下資訊，生成10個有助於解決讀者問題並傳達可信度、具有強大SEO效果嘅博客文章標題建議。",
    keywords_label: "關鍵詞",
    audience_label: "目標讀者",
    title_language_rule: "**嚴格指示:** 所有標題建議必須完全用粵語（繁體中文）撰寫。",
    affiliate_role: "你係一位頂級嘅聯盟營銷人員。請撰寫一篇具有高度說服力嘅文章，打動讀者並引導其購買。請強調同理心、利益訴求、建立信任同強有力嘅號召性用語。請用**粗體**強調重要部分。",
    owned_media_role: "你係一位經驗豐富嘅內容營銷人員。請撰寫一篇高質量嘅資訊性文章，以建立讀者信任並提升品牌價值。保持中立同客觀，避免直接嘅銷售宣傳。用**粗體**強調重要部分。",
    basic_info_heading: "文章創作基本資訊",
    article_title_label: "文章標題",
    urls_heading: "優先參考URL",
    urls_intro: "請使用以下網站資訊作為首要知識庫生成文章",
    requirements_heading: "共同嚴格要求",
    structure: |h2, h3| format!(
        "- **結構:** 必須包含引言、正文和結論。正文必須使用**恰好{}個H2標題**，每個H2下最多使用**{}個H3標題**。",
        h2, h3
    ),
    length: |chars| format!("- **字數:** 每個H2部分嘅正文長度約為**{}字**。", chars),
    seo: |keywords| format!("- **SEO:** 有策略地放置關鍵詞 ({})。", keywords),
    quality: |tone, description| format!(
        "- **品質:** 文章語調應為“{}” ({})。段落應為3-4句。適當使用項目符號。",
        tone, description
    ),
    meta: "- **元描述:** 生成一個約**120字**嘅有吸引力嘅元描述。",
    custom: |custom| format!("- **附加說明:** {}", custom),
    tone_description: |tone| match tone {
        Tone::Normal => "禮貌、規範、易於理解嘅常規文章。",
        Tone::Casual => "同讀者距離近、親切隨意嘅口語體文章。",
        Tone::Formal => "專業、權威、重視信賴性嘅正式書面文章。",
    },
    article_language_rule: "**嚴格指示:** 包括文章正文同元描述在內嘅所有輸出內容，都必須完全用粵語（繁體中文）撰寫。",
    grounded_output: "請根據可靠來源提供準確同最新嘅資訊。\n\n**輸出格式:**\n首先，撰寫文章正文（Markdown格式），然後插入“---meta---”作為分隔符，最後撰寫元描述。請嚴格遵守此格式。",
    meta_fallback: "元描述生成失敗。",
};

static KOREAN: TemplateSet = TemplateSet {
    title_role: "당신은 기업의 온드 미디어를 담당하는 콘텐츠 마케터입니다. 다음 정보를 바탕으로 독자의 문제 해결에 도움이 되고 신뢰성을 전달할 수 있는 SEO에 강한 블로그 게시물 제목 아이디어 10개를 생성해 주세요.",
    keywords_label: "키워드",
    audience_label: "타겟 독자",
    title_language_rule: "**엄수 지시:** 모든 제목 제안은 반드시 한국어로만 작성되어야 합니다.",
    affiliate_role: "당신은 최고의 제휴 마케터입니다. 독자의 마음을 움직여 구매로 이어지는 설득력 있는 기사를 작성해 주세요. 공감, 혜택 소구, 신뢰 구축, 강력한 CTA를 강조해 주세요. 중요한 부분은 **굵은 글씨**로 강조해 주세요.",
    owned_media_role: "당신은 숙련된 콘텐츠 마케터입니다. 독자의 신뢰를 구축하고 브랜드 가치를 높이는 고품질 정보 기사를 작성하십시오. 중립성과 객관성을 유지하고 직접적인 판매 홍보를 피하십시오. 중요한 부분은 **굵은 글씨**로 강조하십시오.",
    basic_info_heading: "기사 작성 기본 정보",
    article_title_label: "기사 제목",
    urls_heading: "우선 참조 URL",
    urls_intro: "다음 웹사이트의 정보를 최우선 지식 기반으로 사용하여 기사를 생성하십시오",
    requirements_heading: "공통 엄수 요건",
    structure: |h2, h3| format!(
        "- **구조:** 서론, 본문, 결론을 반드시 포함해야 합니다. 본문은 **정확히 {}개의 H2 제목**을 사용하고, 각 H2 아래에는 **최대 {}개의 H3 제목**을 사용하십시오.",
        h2, h3
    ),
    length: |chars| format!("- **글자 수:** 각 H2 섹션의 본문은 약 **{}자**로 조정하십시오.", chars),
    seo: |keywords| format!("- **SEO:** 키워드({})를 전략적으로 배치하십시오.", keywords),
    quality: |tone, description| format!(
        "- **품질:** 문장의 톤은 \"{}\"({})이어야 합니다. 단락은 3-4 문장으로 간결하게 작성하고, 글머리 기호를 적절히 사용하십시오.",
        tone, description
    ),
    meta: "- **메타 설명:** 약 **120자**의 매력적인 메타 설명을 생성하십시오.",
    custom: |custom| format!("- **추가 지시사항:** {}", custom),
    tone_description: |tone| match tone {
        Tone::Normal => "입니다/습니다 체를 기본으로 한 정중하고 알기 쉬운 일반적인 문장.",
        Tone::Casual => "독자와의 거리가 가까운 친근한 캐주얼 구어체 문장.",
        Tone::Formal => "전문적이고 권위 있으며 신뢰성을 중시하는 격식 있는 문장.",
    },
    article_language_rule: "**엄수 지시:** 기사 본문과 메타 설명을 포함한 모든 출력물은 반드시 한국어로만 작성되어야 합니다.",
    grounded_output: "신뢰할 수 있는 출처를 바탕으로 정확하고 최신 정보를 제공하십시오.\n\n**출력 형식:**\n먼저 기사 본문(마크다운 형식)을 작성한 다음 \"---meta---\"를 구분 기호로 삽입하고 마지막으로 메타 설명을 작성하십시오. 이 형식을 엄격히 준수하십시오.",
    meta_fallback: "메타 설명 생성에 실패했습니다.",
};
