//! Prompt assembly: the persona, the rendered retrieval block and the final
//! message list sent to the chat model.

use profchat_core::{Conversation, Message, RetrievedRecord};

/// Most records ever rendered into one prompt.
pub const MAX_RECORDS: usize = 3;

pub const RESULTS_BANNER: &str = "\n\nReturned results from vector db (done automatically): ";

const MISSING: &str = "n/a";

pub const SYSTEM_PROMPT: &str = "\
You are an AI assistant that helps students find professors that fit their needs and \
preferences. For each question, provide the 3 most relevant professors, using the professor \
reviews retrieved for you and appended to the question (retrieval-augmented generation).

Your knowledge base describes professors by:
- Teaching style and methods
- Course difficulty and workload
- Grading policies and fairness
- Areas of expertise and research interests
- Student reviews and ratings
- Availability for office hours and extra help
- Teaching experience and qualifications

For each question:
1. Analyze the request and identify the student's key criteria and preferences.
2. Use the retrieved reviews as your source of information.
3. Evaluate and rank the professors by how well they match those criteria.
4. Present the top 3 professors with a concise summary of each, including:
   - Name and department
   - Key strengths relevant to the question
   - Overall rating (for example 4.5/5)
   - A brief quote from a student review
5. Offer more detail about any of the suggested professors if the student asks for it.

Remember to:
- Be objective and fair in your assessments
- Respect privacy and never share personal information about professors or students
- Encourage students to consider multiple factors when choosing a professor
- Remind students that experiences vary, so the information is a guide rather than an absolute truth

If a question is unclear or lacks specific criteria, ask follow-up questions to understand the \
student's needs before recommending anyone.

Your goal is to help students make informed course decisions by matching them with professors \
who fit their learning style and academic goals.
";

/// Renders one record as the fixed four-line block the model is primed for.
pub fn render_record(record: &RetrievedRecord) -> String {
    let field = |key: &str| record.metadata_text(key).unwrap_or_else(|| MISSING.to_string());
    format!(
        "\nProfessor: {}\nSubject: {}\nRating: {}/5\nReview: {}\n\n",
        record.id,
        field("subject"),
        field("stars"),
        field("review"),
    )
}

/// Banner followed by at most [`MAX_RECORDS`] blocks, in ranked order.
/// Empty when there is nothing to render.
pub fn render_records(records: &[RetrievedRecord]) -> String {
    if records.is_empty() {
        return String::new();
    }
    records
        .iter()
        .take(MAX_RECORDS)
        .fold(RESULTS_BANNER.to_string(), |mut rendered, record| {
            rendered.push_str(&render_record(record));
            rendered
        })
}

/// System persona, the history, then the last user message with the
/// retrieval block appended. Always `conversation.len() + 1` messages.
pub fn build_messages(conversation: &Conversation, records: &[RetrievedRecord]) -> Vec<Message> {
    let history = conversation.history();
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(Message::system(SYSTEM_PROMPT));
    messages.extend_from_slice(history);

    let mut content = conversation.last().content.clone();
    content.push_str(&render_records(records));
    messages.push(Message::user(content));
    messages
}
