use std::fmt::Write;
use std::sync::LazyLock;

use itertools::Itertools;
use regex::Regex;

use super::quiz::SubProblem;
use super::story::StoryBeat;
use super::CaseModule;

static HTML_TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());

/// Plain-text study sheet for a case module. Study records are left out.
pub fn render(module: &CaseModule) -> String {
    let mut out = String::new();
    let _ = write_report(&mut out, module);
    out
}

fn write_report(out: &mut String, m: &CaseModule) -> std::fmt::Result {
    write!(out, "タイトル: {}\n\n", m.title)?;
    write!(out, "引用: {}\n\n", m.citation)?;
    write!(out, "ランク: {}\n\n", m.rank)?;
    write!(out, "タグ: {}\n\n", m.tags.join(", "))?;
    write!(out, "右側キャラクター: {}\n\n", m.right_side_characters.join(", "))?;

    out.push_str("=== Q&A ===\n\n");
    for qa in &m.questions_and_answers {
        writeln!(out, "ID: {}", qa.id)?;
        writeln!(out, "ランク: {}", qa.rank)?;
        writeln!(out, "質問: {}", qa.question)?;
        write!(out, "回答: {}\n\n", qa.answer)?;
    }

    out.push_str("=== ストーリー ===\n\n");
    for beat in &m.story {
        write_beat(out, beat)?;
        out.push('\n');
    }

    out.push_str("=== 判旨と解説 ===\n\n");
    write!(out, "{}\n\n", HTML_TAG_RE.replace_all(&m.explanation, ""))?;

    if !m.quiz.is_empty() {
        out.push_str("=== ミニ論文問題 ===\n\n");
        for quiz in &m.quiz {
            writeln!(out, "タイトル: {}", quiz.title)?;
            writeln!(out, "ランク: {}", quiz.rank)?;
            writeln!(out, "背景: {}", quiz.background)?;
            for sub in &quiz.sub_problems {
                write_sub_problem(out, sub)?;
            }
        }
    }

    Ok(())
}

fn write_beat(out: &mut String, beat: &StoryBeat) -> std::fmt::Result {
    match beat.kind.as_str() {
        "scene" => writeln!(out, "シーン: {}", beat.text),
        "narration" => writeln!(out, "ナレーション: {}", beat.text),
        "dialogue" => writeln!(out, "{} ({}): {}", beat.speaker, beat.expression, beat.dialogue),
        "embed" => {
            writeln!(out, "埋め込み: {}", beat.title)?;
            if !beat.description.is_empty() {
                writeln!(out, "説明: {}", beat.description)?;
            }
            let content = beat.content.replace("\\n", "\n").replace("\\t", "\t");
            if !content.is_empty() {
                writeln!(out, "--- 埋め込み内容開始 ---\n{}\n--- 埋め込み内容終了 ---", content)?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

fn write_sub_problem(out: &mut String, sub: &SubProblem) -> std::fmt::Result {
    writeln!(out, "サブタイトル: {}", sub.title)?;
    writeln!(out, "ランク: {}", sub.rank)?;
    if !sub.related_qas.is_empty() {
        let ids = sub.related_qas.iter().filter(|id| **id != 0).join(", ");
        writeln!(out, "関連Q&A: {}", ids)?;
    }
    writeln!(out, "問題: {}", sub.problem)?;
    writeln!(out, "ヒント: {}", sub.hint)?;
    writeln!(out, "モデル回答: {}", sub.model_answer)?;
    if !sub.points.is_empty() {
        out.push_str("ポイント:\n");
        for point in &sub.points {
            writeln!(out, "- {}", point)?;
        }
        out.push('\n');
    }
    Ok(())
}
