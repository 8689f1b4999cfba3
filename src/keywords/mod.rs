//! Keyword extraction for chunk metadata.
//!
//! Two extractors implement [`KeywordExtractor`]:
//!
//! - [`FrequencyExtractor`] - jieba segmentation with domain vocabulary, TF-IDF ranked
//! - [`SimpleExtractor`] - order-preserving stopword filter
//!
//! The implementation is chosen once at construction via [`ExtractorKind`].

pub mod frequency;
pub mod simple;

use std::collections::HashSet;
use std::sync::LazyLock;

use clap::ValueEnum;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub use frequency::FrequencyExtractor;
pub use simple::SimpleExtractor;

static CODE_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```.*?```").expect("valid code span regex"));

/// Extracts an ordered keyword list from chunk text.
///
/// Implementations must be deterministic: the same text and configuration
/// always yield the same list.
pub trait KeywordExtractor: Send + Sync {
    /// Return at most `k` keywords for `text`.
    fn extract(&self, text: &str, k: usize) -> Vec<String>;

    /// Short name used in logs.
    fn name(&self) -> &'static str;
}

/// Which extractor to build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExtractorKind {
    /// TF-IDF ranking over jieba segmentation with domain vocabulary (default).
    #[default]
    Frequency,
    /// First-seen tokens after stopword filtering.
    Simple,
}

/// Build the configured extractor.
///
/// `extra_words` are appended to the built-in domain vocabulary and only
/// affect the frequency extractor.
#[must_use]
pub fn build_extractor(kind: ExtractorKind, extra_words: &[String]) -> Box<dyn KeywordExtractor> {
    match kind {
        ExtractorKind::Frequency => {
            let mut vocabulary: Vec<String> =
                DOMAIN_WORDS.iter().map(|w| (*w).to_string()).collect();
            vocabulary.extend(extra_words.iter().cloned());
            Box::new(FrequencyExtractor::new(&vocabulary))
        }
        ExtractorKind::Simple => Box::new(SimpleExtractor::new()),
    }
}

/// Remove fenced code spans (opening to closing fence).
#[must_use]
pub fn strip_code_spans(text: &str) -> String {
    CODE_SPAN.replace_all(text, "").into_owned()
}

/// CJK Unified Ideographs, the range the corpus text uses.
#[inline]
#[must_use]
pub fn is_cjk(c: char) -> bool {
    ('\u{4e00}'..='\u{9fff}').contains(&c)
}

#[must_use]
pub fn has_cjk(text: &str) -> bool {
    text.chars().any(is_cjk)
}

/// Stopwords used by the fallback extractor.
pub const BASIC_STOPWORDS: &[&str] = &[
    "的", "了", "在", "是", "我", "有", "和", "就", "不", "人", "都", "一", "一个", "上", "也",
    "很", "到", "说", "要", "去", "你", "会", "着", "没有", "看", "好", "自己", "这", "那", "他",
    "她", "它",
];

/// Extended stopwords used by the frequency extractor.
pub const EXTENDED_STOPWORDS: &[&str] = &[
    "我们", "你们", "他们", "她们", "它们", "这个", "那个", "这些", "那些", "这里", "那里", "这样",
    "那样", "这么", "那么", "什么", "怎么", "为什么", "如何", "哪里", "哪个", "哪些", "多少", "几",
    "可以", "可能", "能够", "应该", "必须", "需要", "要求", "希望", "想要", "因为", "所以", "但是",
    "然而", "虽然", "如果", "然后", "而且", "或者", "例如", "比如", "譬如", "就像", "如同", "似乎",
    "好像", "大约", "大概", "首先", "其次", "最后", "总之", "总而言之", "另外", "此外", "同时",
    "通过", "根据", "按照", "关于", "对于", "至于", "由于", "因此", "进行", "完成", "实现", "达到",
    "取得", "获得", "得到", "提供", "支持", "使用", "利用", "应用", "采用", "选择", "决定", "确定",
    "确认", "开始", "结束", "停止", "继续", "保持", "维持", "改变", "调整", "重要", "主要", "关键",
    "核心", "基本", "根本", "必要", "不同", "相同", "类似", "相似", "相关", "无关", "独立", "依赖",
    "以及", "及其", "其他", "其余", "剩下", "全部", "所有", "每个", "各个", "各种", "各类", "各项",
    "一些", "一点", "一部分", "一方面", "另一方面", "非常", "十分", "极其", "特别", "尤其", "更加",
    "较为", "比较", "一定", "肯定", "确实", "实在", "真正", "的确", "也许", "或许", "差不多", "几乎",
    "近乎", "已经", "曾经", "正在", "将要", "即将", "马上", "立刻", "立即", "刚才", "刚刚", "最近",
    "近来", "目前", "现在", "当前", "如今", "以前", "之前", "今后", "以后", "未来", "将来", "永远",
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
    "from", "up", "about", "into", "through", "during", "before", "after", "above", "below",
    "between", "is", "are", "was", "were", "be", "been", "being", "have", "has", "had", "having",
    "do", "does", "did", "doing", "can", "could", "may", "might", "must", "shall", "should",
    "will", "would", "there", "here", "where", "when", "why", "how", "what", "which", "who",
    "whom", "whose", "this", "that", "these", "those", "i", "you", "he", "she", "it", "we",
    "they", "me", "him", "her", "us", "them", "my", "your", "his", "its", "our", "their", "mine",
    "yours", "hers", "ours", "theirs", "myself", "yourself", "himself", "herself", "itself",
    "ourselves", "yourselves", "themselves",
];

/// Agent-domain vocabulary recognized as whole terms during segmentation.
pub const DOMAIN_WORDS: &[&str] = &[
    "智能体", "Agent", "大语言模型", "LLM", "AI", "人工智能", "提示链", "Prompt Chaining", "路由",
    "Routing", "并行化", "Parallelization", "反思", "Reflection", "工具使用", "Tool Use",
    "函数调用", "Function Calling", "规划", "Planning", "多智能体协作",
    "Multi-Agent Collaboration", "记忆管理", "Memory Management", "模型上下文协议",
    "Model Context Protocol", "目标设定", "Goal Setting", "监控", "Monitoring", "人在回路",
    "Human-in-the-Loop", "知识检索", "Knowledge Retrieval", "RAG", "智能体间通信",
    "Inter-Agent Communication", "资源感知优化", "Resource-Aware Optimization", "推理技术",
    "Reasoning Techniques", "评估", "Evaluation", "优先级", "Prioritization", "探索",
    "Exploration", "发现", "Discovery", "模块化", "分而治之", "管道模式", "工作流", "上下文", "语义",
    "向量化", "嵌入", "检索", "相似度", "相关性", "重排序", "API", "数据库", "外部系统", "实时数据",
    "结构化输出", "JSON", "XML", "自然语言处理", "NLP", "机器学习", "深度学习", "神经网络",
    "Transformer", "注意力机制", "LangChain", "LangGraph", "Crew AI", "Google ADK", "Gemini",
    "OpenAI", "ChromaDB", "Pinecone", "向量数据库", "FastAPI", "自动化", "智能助手", "客户服务",
    "数据分析", "内容生成", "研究助手", "报告生成", "问答系统", "信息检索", "决策支持", "任务规划",
    "资源分配", "协作系统", "知识管理",
];

/// Build a lookup set from a stopword table, lowercased for latin matching.
fn stopword_set(tables: &[&[&str]]) -> HashSet<String> {
    tables
        .iter()
        .flat_map(|t| t.iter())
        .map(|w| w.to_lowercase())
        .collect()
}
