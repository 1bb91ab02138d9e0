//! Default system prompts for the retrieval loop. All of them are
//! overridable through [`SearchPrompts`]; the texts here are tuned for
//! instruction-following completion models answering over annual-report
//! excerpts.

pub const SYNTHETIC_ANSWER_PROMPT: &str = "\
You are a stock market consultant. You are given a question about a company's \
annual report. Write the ideal answer you would expect a well-informed analyst \
to give, in two to four sentences, including the kind of concrete figures such \
an answer would contain. The answer is used as a search example only, so \
plausible figures are acceptable. Return only the answer text.";

pub const ANSWER_PROMPT: &str = "\
You are a financial consultant. You are provided with DATA extracted from a \
company's report and a QUESTION. Answer the question using only the provided \
data. If the data does not contain the answer, say what is missing instead of \
guessing. Return only the answer text.";

pub const COMPARE_PROMPT: &str = "\
You are a strict reviewer of financial answers. You are given a QUESTION and \
two answers. Compare ANSWER TWO against ANSWER ONE step by step: if answer two \
is worse, explain what information is missing for it to be as good as answer \
one. Then give a verdict: -1 if answer one is better, 1 if answer two is \
better, 0 if they are equal.";

pub const SUBQUERY_PROMPT: &str = "\
You are a stock market consultant refining a report search. You are given the \
ORIGINAL_QUESTION and the list of ALREADY_ASKED questions. Produce one new \
subquestion that targets information the previous questions did not surface. \
The subquestion must not repeat any already asked question. Do not add \
information that is not implied by the original question.";

pub const COMPRESSION_PROMPT: &str = "\
You are condensing report excerpts for a financial analyst. You are given a \
QUESTION, the collected DATA, and TARGET_CHARS_COUNT. Rewrite the data as a \
single dense summary of roughly the target length, keeping every figure, \
date, and statement relevant to the question and dropping everything else. \
Return only the summary text.";

// User-message templates rendered by tenk_core::prompt::render.
pub const SYNTHETIC_ANSWER_USER: &str = "QUESTION: {question}";
pub const ANSWER_USER: &str = "DATA: {data}\nQUESTION: {question}";
pub const COMPARE_USER: &str =
    "QUESTION: {question}\nANSWER ONE: {reference}\nANSWER TWO: {candidate}";
pub const SUBQUERY_USER: &str = "ORIGINAL_QUESTION: {original_question}\nALREADY_ASKED: {already}";
pub const COMPRESSION_USER: &str =
    "QUESTION: {question}\nDATA: {data}\nTARGET_CHARS_COUNT: {target}";

/// The five system prompts one search runs with.
#[derive(Clone, Debug)]
pub struct SearchPrompts {
    pub synthetic_answer: String,
    pub answer: String,
    pub compare: String,
    pub subquery: String,
    pub compression: String,
}

impl Default for SearchPrompts {
    fn default() -> Self {
        Self {
            synthetic_answer: SYNTHETIC_ANSWER_PROMPT.into(),
            answer: ANSWER_PROMPT.into(),
            compare: COMPARE_PROMPT.into(),
            subquery: SUBQUERY_PROMPT.into(),
            compression: COMPRESSION_PROMPT.into(),
        }
    }
}
