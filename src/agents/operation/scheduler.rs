//! 日程管理猫
//!
//! 请求分类为 create / update / delete / view / other；每次请求都附上「現在のスケジュール情報」
//! （今天与明天的日程，来自内存中的事件列表），再按类型追加指示块。

use chrono::{DateTime, Duration, FixedOffset, Local, NaiveDate};
use serde::Serialize;

use crate::agents::Conversation;
use crate::core::{AgentContext, AgentError, KeywordClassifier};

pub const AGENT_ID: &str = "scheduler_cat";

const INSTRUCTIONS: &str = "あなたは「スケジュール管理猫」という名前の猫猫カンパニーのスケジュール管理AIエージェントです。
予定管理猫と会議調整猫を統括し、スケジュールの管理を行う役割を担っています。

予定の優先度、移動時間や準備時間、参加者全員の都合を考慮し、予定が重複しないよう注意してください。
回答は常に日本語で行い、猫らしい几帳面で時間を大切にする口調（「～時間厳守にゃ！」「～予定にしておくニャン」）を適度に使用してください。

スケジュール情報は以下の形式で整理してください：
1. リクエスト概要
2. 現在のスケジュール状況
3. 提案する日程または調整結果
4. 補足情報や注意事項";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleRequestType {
    Create,
    Update,
    Delete,
    View,
    Other,
}

pub fn classifier() -> KeywordClassifier<ScheduleRequestType> {
    KeywordClassifier::new(ScheduleRequestType::Other)
        .rule(
            ScheduleRequestType::Create,
            &["作成", "登録", "追加", "入れて", "予約", "新しい", "新規"],
        )
        .rule(
            ScheduleRequestType::Update,
            &["変更", "更新", "修正", "移動", "調整", "延期"],
        )
        .rule(
            ScheduleRequestType::Delete,
            &["削除", "取り消し", "キャンセル", "中止", "除外"],
        )
        .rule(
            ScheduleRequestType::View,
            &["確認", "表示", "見せて", "教えて", "スケジュール", "予定", "カレンダー"],
        )
}

/// 日程事件
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub id: String,
    pub title: String,
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    pub participants: Vec<String>,
    pub location: String,
}

impl Event {
    fn line(&self) -> String {
        format!(
            "- {}～{} {} @ {} (参加者: {})",
            self.start.format("%H:%M"),
            self.end.format("%H:%M"),
            self.title,
            self.location,
            self.participants.join(", ")
        )
    }
}

fn event(
    id: &str,
    title: &str,
    start: &str,
    end: &str,
    participants: &[&str],
    location: &str,
) -> Option<Event> {
    Some(Event {
        id: id.to_string(),
        title: title.to_string(),
        start: DateTime::parse_from_rfc3339(start).ok()?,
        end: DateTime::parse_from_rfc3339(end).ok()?,
        participants: participants.iter().map(|p| p.to_string()).collect(),
        location: location.to_string(),
    })
}

/// 内置示例日程
pub fn sample_events() -> Vec<Event> {
    [
        event(
            "event001",
            "朝会",
            "2025-02-26T09:00:00+09:00",
            "2025-02-26T09:30:00+09:00",
            &["佐藤", "田中", "鈴木"],
            "会議室A",
        ),
        event(
            "event002",
            "プロジェクトミーティング",
            "2025-02-26T13:00:00+09:00",
            "2025-02-26T14:30:00+09:00",
            &["佐藤", "高橋", "渡辺", "伊藤"],
            "会議室B",
        ),
        event(
            "event003",
            "取引先訪問",
            "2025-02-27T10:00:00+09:00",
            "2025-02-27T12:00:00+09:00",
            &["田中", "斎藤"],
            "株式会社ABC",
        ),
    ]
    .into_iter()
    .flatten()
    .collect()
}

pub struct SchedulerCat {
    conversation: Conversation,
    classifier: KeywordClassifier<ScheduleRequestType>,
    events: Vec<Event>,
    /// 固定「今天」；None 时取本地日期
    today: Option<NaiveDate>,
    debug: bool,
}

impl SchedulerCat {
    pub fn new(ctx: &AgentContext) -> Self {
        Self {
            conversation: Conversation::new(AGENT_ID, INSTRUCTIONS, ctx),
            classifier: classifier(),
            events: sample_events(),
            today: None,
            debug: ctx.debug(),
        }
    }

    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub fn request_type(&self, request: &str) -> ScheduleRequestType {
        self.classifier.classify(request)
    }

    fn day_block(&self, heading: &str, day: NaiveDate) -> String {
        let mut events: Vec<&Event> = self
            .events
            .iter()
            .filter(|e| e.start.date_naive() == day)
            .collect();
        events.sort_by_key(|e| e.start);
        let body = if events.is_empty() {
            "予定はありません".to_string()
        } else {
            events.iter().map(|e| e.line()).collect::<Vec<_>>().join("\n")
        };
        format!("{heading}\n{body}")
    }

    /// 今天与明天的日程摘要
    pub fn schedule_info(&self) -> String {
        let today = self.today.unwrap_or_else(|| Local::now().date_naive());
        format!(
            "{}\n\n{}",
            self.day_block("【本日の予定】", today),
            self.day_block("【明日の予定】", today + Duration::days(1))
        )
    }

    pub async fn process_schedule_request(&self, request: &str) -> Result<String, AgentError> {
        let request_type = self.request_type(request);
        if self.debug {
            tracing::debug!(agent = AGENT_ID, ?request_type, "classified");
        }
        let mut prompt = format!("{request}\n\n現在のスケジュール情報:\n{}", self.schedule_info());
        match request_type {
            ScheduleRequestType::Create => prompt.push_str(
                "\n\n以下の形式で新規予定を提案してください:\n\
                 - タイトル: [予定名]\n\
                 - 日時: [開始時間]-[終了時間]\n\
                 - 参加者: [参加者リスト]\n\
                 - 場所: [会議室または場所]",
            ),
            ScheduleRequestType::Update => prompt.push_str("\n\n変更案を提案してください。"),
            ScheduleRequestType::Delete => {
                prompt.push_str("\n\n削除対象の予定を特定してください。")
            }
            ScheduleRequestType::View | ScheduleRequestType::Other => {}
        }
        self.conversation.message(&prompt).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::testing::{mock_context, EchoCountLlm};
    use std::sync::Arc;

    fn feb(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 2, day).unwrap()
    }

    #[test]
    fn test_request_type() {
        let c = classifier();
        assert_eq!(c.classify("明日の予定を教えて"), ScheduleRequestType::View);
        assert_eq!(c.classify("会議を登録して"), ScheduleRequestType::Create);
        assert_eq!(c.classify("予定を追加"), ScheduleRequestType::Create);
        assert_eq!(c.classify("朝会を延期"), ScheduleRequestType::Update);
        assert_eq!(c.classify("訪問をキャンセル"), ScheduleRequestType::Delete);
        assert_eq!(c.classify(""), ScheduleRequestType::Other);
    }

    #[test]
    fn test_schedule_info_for_fixed_day() {
        let cat = SchedulerCat::new(&mock_context()).with_today(feb(26));
        let info = cat.schedule_info();
        assert_eq!(
            info,
            "【本日の予定】\n\
             - 09:00～09:30 朝会 @ 会議室A (参加者: 佐藤, 田中, 鈴木)\n\
             - 13:00～14:30 プロジェクトミーティング @ 会議室B (参加者: 佐藤, 高橋, 渡辺, 伊藤)\n\n\
             【明日の予定】\n\
             - 10:00～12:00 取引先訪問 @ 株式会社ABC (参加者: 田中, 斎藤)"
        );
    }

    #[test]
    fn test_schedule_info_empty_days() {
        let cat = SchedulerCat::new(&mock_context()).with_today(feb(10));
        assert_eq!(
            cat.schedule_info(),
            "【本日の予定】\n予定はありません\n\n【明日の予定】\n予定はありません"
        );
    }

    #[tokio::test]
    async fn test_create_prompt_has_proposal_block() {
        let llm = Arc::new(EchoCountLlm::default());
        let mut ctx = mock_context();
        ctx.llm = llm.clone();
        let cat = SchedulerCat::new(&ctx).with_today(feb(27));
        cat.process_schedule_request("会議を登録して").await.unwrap();
        let prompt = llm.last_prompt();
        assert!(prompt.contains("現在のスケジュール情報:\n【本日の予定】\n- 10:00～12:00 取引先訪問"));
        assert!(prompt.ends_with("- 場所: [会議室または場所]"));

        cat.process_schedule_request("訪問をキャンセル").await.unwrap();
        assert!(llm.last_prompt().ends_with("削除対象の予定を特定してください。"));
    }
}
