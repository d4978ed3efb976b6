//! Seeded mock content: debate statements, structure critique and report

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use regex::Regex;
use std::sync::OnceLock;

use crate::models::{Role, Structure, Turn};

/// Notes shorter than this (in characters) get the fixed "not clear yet" structure
pub const SHORT_NOTE_CHARS: usize = 20;

const PADDING_SENTENCE: &str = "다음 라운드에서 주장과 근거를 더 명확히 보완하십시오";

const PRO_REASONS: &[&str] = &[
    "현실적인 효율과 접근성을 크게 높일 수 있습니다",
    "개인의 학습 격차를 맞춤형으로 줄이는 데 유리합니다",
    "빠른 피드백 루프로 반복 학습을 강화합니다",
];

const PRO_COUNTERS: &[&str] = &[
    "다만 편향된 정보나 과도한 의존이 생길 수 있다는 점은 대비가 필요합니다",
    "하지만 인간 교사의 역할까지 완전히 대체하기엔 정서적 상호작용이 부족할 수 있습니다",
    "그럼에도 검증 체계가 없다면 품질 편차가 커질 위험이 있습니다",
];

const CON_WEAKNESSES: &[&str] = &[
    "핵심 가정이 '모든 사용자에게 동일한 품질의 피드백이 제공된다'는 점인데 현실에서 흔들릴 수 있습니다",
    "근거가 비용 절감에 치우쳐 장기적 부작용(사고력 저하, 의존성)을 충분히 고려하지 않았습니다",
    "전제 조건(검증, 책임, 안전장치)이 빠져 있어 실행 시 실패 가능성이 큽니다",
];

const CON_ALTERNATIVES: &[&str] = &[
    "따라서 전면 도입보다 제한된 범위에서 검증하고, 사람의 감독을 의무화하는 조건부 도입이 합리적입니다",
    "대안으로는 AI를 보조 도구로 두고, 최종 판단과 코칭은 사람에게 남기는 혼합 모델이 더 안전합니다",
    "그래서 고위험 영역부터 제외하고, 평가 기준과 책임 주체를 명확히 한 뒤 단계적으로 확대해야 합니다",
];

const CLAIM_STARTERS: &[&str] = &["제 입장은", "저는", "결론적으로"];

const REASONS_POOL: &[&str] = &[
    "현실적인 비용과 시간 측면에서 효과가 큽니다",
    "학습자의 동기와 지속성을 높일 수 있습니다",
    "검증 가능한 기준과 피드백 루프를 만들 수 있습니다",
    "부작용을 줄이기 위한 안전장치를 설계할 수 있습니다",
];

const ASSUMPTIONS_POOL: &[&str] = &[
    "사용자가 충분한 시간을 들여 자신의 논리를 작성한다는 가정",
    "피드백이 편향 없이 일관되게 제공된다는 가정",
];

const COUNTER_POOL: &[&str] = &[
    "AI의 피드백 품질이 상황에 따라 흔들릴 수 있다는 점",
    "사용자가 결과에 의존해 스스로 사고를 덜 하게 될 위험",
];

const MISSING_POOL: &[&str] = &[
    "사용자군(학생/직장인)에 따라 어떤 효과 지표를 쓸지",
    "피드백 신뢰도를 어떻게 검증하고 책임질지",
];

const NEXT_QUESTIONS: &[&str] = &[
    "이 주장을 검증할 수 있는 지표(성과/부작용)는 무엇인가?",
    "가장 강한 반대 논리는 무엇이며, 그에 대한 반박은 무엇인가?",
    "조건부 도입을 한다면 어떤 범위와 안전장치가 필요한가?",
];

pub const REPORT_TITLE: &str = "# 📝 ThinkGym 세션 리포트";

/// Section headings of the rendered report, in order
pub const REPORT_SECTIONS: [&str; 5] = [
    "## 1. 오늘의 질문",
    "## 2. 찬반 핵심 요약",
    "## 3. 사용자의 입장",
    "## 4. 논리 구조 개선 포인트",
    "## 5. 다음 라운드 추천 질문",
];

static WORD_PATTERN: OnceLock<Regex> = OnceLock::new();

fn word_pattern() -> &'static Regex {
    WORD_PATTERN.get_or_init(|| Regex::new(r"[\p{L}\p{N}]+").unwrap())
}

fn pick<'a>(rng: &mut StdRng, pool: &[&'a str]) -> &'a str {
    pool.choose(rng).copied().unwrap_or_default()
}

fn sample(rng: &mut StdRng, pool: &[&str], amount: usize) -> Vec<String> {
    rand::seq::index::sample(rng, pool.len(), amount.min(pool.len()))
        .into_iter()
        .map(|i| pool[i].to_string())
        .collect()
}

/// Split on periods, dropping empty pieces
fn period_parts(text: &str) -> Vec<&str> {
    text.split('.')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect()
}

/// Force `text` into exactly three period-terminated sentences, padding when short
pub fn normalize_sentences_3(text: &str) -> String {
    let flat = text.replace(['\r', '\n'], " ");
    let mut parts: Vec<&str> = period_parts(&flat).into_iter().take(3).collect();
    while parts.len() < 3 {
        parts.push(PADDING_SENTENCE);
    }
    format!("{}.", parts.join(". "))
}

/// Word tokens of 2 to 6 characters, first occurrence order, at most 8
pub fn extract_keywords(text: &str) -> Vec<String> {
    let mut keywords: Vec<String> = Vec::new();
    for token in word_pattern().find_iter(text).map(|m| m.as_str()) {
        let len = token.chars().count();
        if (2..=6).contains(&len) && !keywords.iter().any(|k| k == token) {
            keywords.push(token.to_string());
        }
    }
    keywords.truncate(8);
    keywords
}

fn infer_stance(note: &str) -> &'static str {
    let lowered = note.to_lowercase();
    if ["찬성", "필요", "도입", "좋", "해야"]
        .iter()
        .any(|k| lowered.contains(k))
    {
        "긍정적인"
    } else if ["반대", "우려", "위험", "문제", "안"]
        .iter()
        .any(|k| lowered.contains(k))
    {
        "신중한"
    } else {
        "조건부"
    }
}

pub fn mock_pro(topic: &str, rng: &mut StdRng) -> String {
    let reasons = sample(rng, PRO_REASONS, 2);
    let counter = pick(rng, PRO_COUNTERS);
    format!(
        "저는 '{}'에 대해 찬성합니다. 그 이유는 {} 그리고 {}. {}.",
        topic, reasons[0], reasons[1], counter
    )
}

/// The rebuttal opens by quoting a keyword of the pro statement it answers
pub fn mock_con(pro_statement: &str, rng: &mut StdRng) -> String {
    let keywords = extract_keywords(pro_statement);
    let keyword = keywords
        .choose(rng)
        .map(String::as_str)
        .unwrap_or("효율");
    let weakness = pick(rng, CON_WEAKNESSES);
    let alternative = pick(rng, CON_ALTERNATIVES);
    format!(
        "{}에 대한 주장은 매력적이지만, 그 자체가 곧 타당성을 보장하진 않습니다. {}. {}.",
        keyword, weakness, alternative
    )
}

/// Two pro/con exchanges in pro, con, pro, con order
pub fn mock_debate(topic: &str, rng: &mut StdRng) -> Vec<Turn> {
    let mut turns = Vec::with_capacity(4);
    for _ in 0..2 {
        let pro = mock_pro(topic, rng);
        let con = mock_con(&pro, rng);
        turns.push(Turn::new(Role::Pro, pro));
        turns.push(Turn::new(Role::Con, con));
    }
    turns
}

/// Fixed critique for a note too short to analyse
pub fn unclear_structure() -> Structure {
    Structure {
        claim: "입장이 아직 명확히 정리되지 않았습니다.".to_string(),
        reasons: Vec::new(),
        assumptions: Vec::new(),
        counterpoints: Vec::new(),
        missing_info: vec![
            "주장을 1문장으로 명확히 작성하세요".to_string(),
            "근거를 최소 2개 제시하세요".to_string(),
        ],
        next_revision: "주장을 1문장으로 정리하십시오. 그 주장을 뒷받침하는 근거 2가지를 추가하십시오. 반대 의견에 대한 대비를 포함하십시오.".to_string(),
    }
}

pub fn mock_structure(topic: &str, user_note: &str, rng: &mut StdRng) -> Structure {
    let note = user_note.trim();
    if note.chars().count() < SHORT_NOTE_CHARS {
        return unclear_structure();
    }

    let claim = format!(
        "{} '{}'에 대해 {} 입장입니다",
        pick(rng, CLAIM_STARTERS),
        topic,
        infer_stance(note)
    );

    let reason_count = if rng.gen_bool(0.7) { 2 } else { 3 };
    let reasons = sample(rng, REASONS_POOL, reason_count);
    let assumption_count = if rng.gen_bool(0.7) { 1 } else { 2 };
    let assumptions = sample(rng, ASSUMPTIONS_POOL, assumption_count);
    let counter_count = if rng.gen_bool(0.6) { 1 } else { 2 };
    let counterpoints = sample(rng, COUNTER_POOL, counter_count);
    let missing_count = if rng.gen_bool(0.6) { 1 } else { 2 };
    let missing_info = sample(rng, MISSING_POOL, missing_count);

    Structure {
        claim,
        reasons,
        assumptions,
        counterpoints,
        missing_info,
        next_revision: normalize_sentences_3(
            "내 주장을 한 문장으로 더 명확히 쓰십시오. 근거는 사례나 기준으로 구체화하십시오. 가장 강한 반론 1개에 대한 답을 포함하십시오",
        ),
    }
}

fn summarize_role_lines(debate: &[Turn], role: Role, n: usize) -> Vec<String> {
    let mut lines: Vec<String> = debate
        .iter()
        .filter(|t| t.role == role)
        .flat_map(|t| period_parts(&t.text))
        .take(n)
        .map(|s| format!("{}.", s))
        .collect();
    while lines.len() < n {
        lines.push("핵심 논지를 더 명확히 정리할 여지가 있습니다.".to_string());
    }
    lines
}

fn summarize_note_lines(note: &str, n: usize) -> Vec<String> {
    let note = note.trim();
    if note.is_empty() {
        return vec![
            "(사용자 입력이 비어 있습니다.)".to_string(),
            "주장을 1문장으로 정리해보세요.".to_string(),
            "근거 2개를 추가해보세요.".to_string(),
        ];
    }

    let normalized = note.replace('\r', "\n");
    let mut lines: Vec<String> = normalized
        .split('\n')
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect();
    if lines.len() < n {
        lines.extend(period_parts(note).into_iter().map(|s| format!("{}.", s)));
    }
    lines.truncate(n);
    while lines.len() < n {
        lines.push("추가 근거 또는 반론 대비를 보완해보세요.".to_string());
    }
    lines
}

fn first_or<'a>(items: &'a [String], fallback: &'a str) -> &'a str {
    items.first().map(String::as_str).unwrap_or(fallback)
}

/// Render the five-section markdown session report
pub fn mock_report(
    topic: &str,
    debate: &[Turn],
    user_note: &str,
    structure: &Structure,
    rng: &mut StdRng,
) -> String {
    let pro = summarize_role_lines(debate, Role::Pro, 3);
    let con = summarize_role_lines(debate, Role::Con, 3);
    let user = summarize_note_lines(user_note, 3);

    let assumption = first_or(&structure.assumptions, "가정이 명확하지 않습니다");
    let counter = first_or(&structure.counterpoints, "반론 고려가 부족합니다");
    let missing = first_or(&structure.missing_info, "추가 정보가 필요합니다");
    let next_question = pick(rng, NEXT_QUESTIONS);

    let mut report = String::new();
    report.push_str(&format!("{}\n\n", REPORT_TITLE));
    report.push_str(&format!("{}\n{}\n\n", REPORT_SECTIONS[0], topic));
    report.push_str(&format!("{}\n", REPORT_SECTIONS[1]));
    report.push_str(&format!("- **찬성:** {}\n  {}\n  {}\n", pro[0], pro[1], pro[2]));
    report.push_str(&format!("- **반대:** {}\n  {}\n  {}\n\n", con[0], con[1], con[2]));
    report.push_str(&format!(
        "{}\n{}\n{}\n{}\n\n",
        REPORT_SECTIONS[2], user[0], user[1], user[2]
    ));
    report.push_str(&format!(
        "{}\n- {}\n- {}\n- {}\n\n",
        REPORT_SECTIONS[3], assumption, counter, missing
    ));
    report.push_str(&format!("{}\n{}\n", REPORT_SECTIONS[4], next_question));
    report
}
