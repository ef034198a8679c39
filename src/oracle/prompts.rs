//! Oracle 使用的 prompt 模板

use crate::sources::SourceKind;

pub(super) fn summary_prompt(kind: SourceKind) -> &'static str {
    match kind {
        SourceKind::Mail => {
            "Analyze the following emails and provide:\n\
             1. A concise summary of key points from each important email\n\
             2. Any action items or tasks that need to be addressed\n\
             3. Emails grouped by priority (High, Medium, Low)\n\
             4. Any deadline-sensitive items\n\
             Format the response as Markdown with '## Email Summary' and '## Action Items' sections."
        }
        SourceKind::Calendar => {
            "Analyze the following calendar events and provide:\n\
             1. A timeline of upcoming meetings for today and tomorrow\n\
             2. Any preparation needed for meetings\n\
             3. Conflicts or back-to-back meetings\n\
             Format the response as Markdown with '## Meeting Schedule' and '## Preparation Required' sections."
        }
        SourceKind::Chat => {
            "Analyze the following chat messages and provide:\n\
             1. A summary of important conversations\n\
             2. Action items or requests directed at the user\n\
             3. Unanswered questions or pending replies\n\
             Format the response as Markdown with '## Chat Summary', '### Action Items' and '### Follow-ups Required' sections."
        }
        SourceKind::Issues => {
            "Analyze the following issue-tracker tickets and provide:\n\
             1. A summary of tickets by priority\n\
             2. Upcoming deadlines or due dates\n\
             3. Status updates on tickets\n\
             Format the response as Markdown with '## Tickets' and '## Upcoming Deadlines' sections."
        }
    }
}

pub(super) fn section_title(kind: SourceKind) -> &'static str {
    match kind {
        SourceKind::Mail => "Email",
        SourceKind::Calendar => "Meeting",
        SourceKind::Chat => "Chat",
        SourceKind::Issues => "Issue tracker",
    }
}

pub(super) const SYNTHESIS_PROMPT: &str = "\
Create a daily executive briefing from the per-source summaries the user provides.\n\
Include:\n\
1. An executive summary of the most important items across all sources\n\
2. A consolidated list of action items, sorted by priority\n\
3. A timeline for today and tomorrow with all meetings and deadlines\n\
4. Areas requiring immediate attention\n\
\n\
After the briefing, append the action items as a fenced ```json block containing an array of \
objects with the string fields \"title\", \"description\" and \"time\".";

fn category_purpose(kind: SourceKind) -> &'static str {
    match kind {
        SourceKind::Mail => "For email related tasks",
        SourceKind::Calendar => "For calendar events and scheduling",
        SourceKind::Chat => "For chat messages and channels",
        SourceKind::Issues => "For issue tracker tickets",
    }
}

pub(super) fn selector_prompt(categories: &[SourceKind]) -> String {
    let list = categories
        .iter()
        .map(|k| format!("- {}: {}", k, category_purpose(*k)))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "You are a tool selector. Available tools and their purposes:\n{}\n\n\
         Select ONLY the tools strictly necessary to directly answer the user's query.\n\
         Respond ONLY with a comma-separated list of tool names. No explanation.",
        list
    )
}
