use regex::Regex;

pub const OPEN_MARK: &str = "{{";
pub const CLOSE_MARK: &str = "}}";
pub const DEFAULT_MAX_MARKS: usize = 5;

/// How a match is rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wrap {
    /// `「kw」` becomes `「{{kw}}」`.
    InsideBrackets,
    /// First occurrence of `kw` becomes `{{kw}}`.
    Term,
}

#[derive(Debug, Clone)]
pub struct HighlightRule {
    pub name: &'static str,
    pub pattern: Regex,
    pub priority: u8,
    pub wrap: Wrap,
}

impl HighlightRule {
    pub fn new(name: &'static str, pattern: &str, priority: u8, wrap: Wrap) -> Result<Self, regex::Error> {
        Ok(HighlightRule {
            name,
            pattern: Regex::new(pattern)?,
            priority,
            wrap,
        })
    }

    fn keyword_list(name: &'static str, words: &[&str]) -> Result<Self, regex::Error> {
        let alternation = words
            .iter()
            .map(|w| regex::escape(w))
            .collect::<Vec<_>>()
            .join("|");
        Self::new(name, &format!("((?:{alternation}))"), 1, Wrap::Term)
    }
}

const DOCTRINE_TERMS: &[&str] = &["通説", "有力説", "判例", "多数説", "少数説", "反対説"];

const CRIMINAL_PROCEDURE_TERMS: &[&str] = &[
    "令状主義", "任意捜査", "強制捜査", "比例原則", "逮捕", "勾留", "捜索", "差押え", "現行犯",
    "準現行犯", "緊急逮捕", "通常逮捕", "公訴事実", "訴因", "一事不再理", "起訴便宜主義",
    "職権主義", "当事者主義", "弁論主義", "処分権主義", "審判対象", "訴訟物", "既判力",
    "公判手続", "証拠法則", "自白法則", "違法収集証拠排除法則", "挙証責任", "証明責任",
    "推定無罪", "黙秘権", "接見交通権", "被疑者", "被告人", "検察官", "弁護人", "裁判官",
    "捜査機関", "警察官", "公訴権", "訴追裁量", "起訴状一本主義", "予断排除", "冒頭陳述",
    "論告", "弁論", "証拠能力", "証明力", "自由心証主義", "補強法則", "伝聞法則", "供述証拠",
    "非供述証拠", "別件逮捕", "違法収集証拠", "毒樹の果実", "排除法則", "相当性", "必要性",
    "緊急性", "意思制圧", "権利侵害", "プライバシー", "住居", "財産", "身体", "自由",
];

const CIVIL_LAW_TERMS: &[&str] = &[
    "善意", "悪意", "過失", "無過失", "有過失", "故意", "重過失", "軽過失", "物権", "債権",
    "所有権", "占有権", "抵当権", "質権", "留置権", "先取特権", "契約", "不法行為", "事務管理",
    "不当利得", "相続", "遺言", "意思表示", "法律行為", "代理", "無効", "取消", "詐欺", "強迫",
    "錯誤", "時効", "消滅時効", "取得時効", "履行", "債務不履行", "損害賠償", "連帯債務", "保証",
    "担保", "対抗要件", "公示", "登記", "引渡し",
];

const CRIMINAL_LAW_TERMS: &[&str] = &[
    "構成要件", "違法性", "責任", "故意", "過失", "因果関係", "実行行為", "結果", "正当防衛",
    "緊急避難", "正当行為", "被害者の承諾", "責任能力", "心神喪失", "心神耗弱", "違法性の意識",
    "期待可能性", "共同正犯", "教唆犯", "幇助犯", "間接正犯", "共謀共同正犯", "未遂", "予備",
    "中止犯", "不能犯", "罪刑法定主義", "類推解釈", "拡張解釈", "法益", "保護法益",
];

const ADMINISTRATIVE_LAW_TERMS: &[&str] = &[
    "処分", "行政行為", "行政処分", "公定力", "不可争力", "不可変更力", "執行力", "取消訴訟",
    "義務付け訴訟", "差止訴訟", "当事者訴訟", "国家賠償", "損失補償", "原告適格", "訴えの利益",
    "処分性", "裁量", "裁量権", "逸脱濫用", "行政指導", "行政契約", "行政計画", "行政立法",
    "通達", "告示", "法律の留保", "侵害留保", "全部留保", "権力留保",
];

/// The built-in rule set for legal study answers.
pub fn default_rules() -> Result<Vec<HighlightRule>, regex::Error> {
    Ok(vec![
        HighlightRule::new("quoted_phrase", r"「([^」]{3,30})」", 2, Wrap::InsideBrackets)?,
        HighlightRule::keyword_list("doctrine", DOCTRINE_TERMS)?,
        HighlightRule::keyword_list("criminal_procedure", CRIMINAL_PROCEDURE_TERMS)?,
        HighlightRule::keyword_list("civil_law", CIVIL_LAW_TERMS)?,
        HighlightRule::keyword_list("criminal_law", CRIMINAL_LAW_TERMS)?,
        HighlightRule::keyword_list("administrative_law", ADMINISTRATIVE_LAW_TERMS)?,
        HighlightRule::new("requirement_1", r"(①[^②③④⑤\n]{5,40})", 1, Wrap::Term)?,
        HighlightRule::new("requirement_2", r"(②[^①③④⑤\n]{5,40})", 1, Wrap::Term)?,
        HighlightRule::new("requirement_3", r"(③[^①②④⑤\n]{5,40})", 1, Wrap::Term)?,
    ])
}

/// Wraps key terms of an answer in `{{…}}` fill-in markers.
pub struct Highlighter {
    rules: Vec<HighlightRule>,
    max_marks: usize,
}

impl Highlighter {
    /// Rules run by descending priority; equal priorities keep their order.
    pub fn new(mut rules: Vec<HighlightRule>, max_marks: usize) -> Self {
        rules.sort_by(|a, b| b.priority.cmp(&a.priority));
        Highlighter { rules, max_marks }
    }

    pub fn with_defaults(max_marks: usize) -> Result<Self, regex::Error> {
        Ok(Self::new(default_rules()?, max_marks))
    }

    pub fn rule_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.rules.iter().map(|r| r.name)
    }

    pub fn apply(&self, answer: &str) -> String {
        if answer.trim().is_empty() || answer.contains(OPEN_MARK) {
            return answer.to_string();
        }

        let mut result = answer.to_string();
        let mut marks = 0;

        'rules: for rule in &self.rules {
            if marks >= self.max_marks {
                break;
            }
            let snapshot = result.clone();
            for caps in rule.pattern.captures_iter(&snapshot) {
                if marks >= self.max_marks {
                    break 'rules;
                }
                let (Some(whole), Some(keyword)) = (caps.get(0), caps.get(1)) else {
                    continue;
                };
                if snapshot[..whole.start()].ends_with(OPEN_MARK) {
                    continue;
                }
                let keyword = keyword.as_str();
                if keyword.chars().count() < 2 {
                    continue;
                }

                let (old, new) = match rule.wrap {
                    Wrap::InsideBrackets => (
                        format!("「{keyword}」"),
                        format!("「{OPEN_MARK}{keyword}{CLOSE_MARK}」"),
                    ),
                    Wrap::Term => (keyword.to_string(), format!("{OPEN_MARK}{keyword}{CLOSE_MARK}")),
                };
                let replaced = result.replacen(&old, &new, 1);
                if replaced != result {
                    result = replaced;
                    marks += 1;
                }
            }
        }

        collapse_nested_marks(&result)
    }
}

fn collapse_nested_marks(text: &str) -> String {
    let mut out = text.to_string();
    while out.contains("{{{{") {
        out = out.replace("{{{{", OPEN_MARK);
    }
    while out.contains("}}}}") {
        out = out.replace("}}}}", CLOSE_MARK);
    }
    out
}
