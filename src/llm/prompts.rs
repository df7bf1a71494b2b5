//! LLM prompts for summarizing provider output and judging answers.

/// Collection of prompts used by the summarizer and the judge.
pub struct Prompts;

impl Prompts {
    /// Substitute `{key}` placeholders in a single pass.
    ///
    /// Substituted values are never rescanned, so provider output that
    /// happens to contain `{query}` is left alone.
    pub fn fill(template: &str, values: &[(&str, &str)]) -> String {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(start) = rest.find('{') {
            out.push_str(&rest[..start]);
            let tail = &rest[start + 1..];

            let hit = values
                .iter()
                .find(|(key, _)| tail.starts_with(key) && tail[key.len()..].starts_with('}'));

            match hit {
                Some((key, value)) => {
                    out.push_str(value);
                    rest = &tail[key.len() + 1..];
                }
                None => {
                    out.push('{');
                    rest = tail;
                }
            }
        }

        out.push_str(rest);
        out
    }

    /// Prompt to turn raw provider output into a data-focused answer.
    ///
    /// Placeholders: `{date}`, `{query}`, `{raw}`.
    pub fn summarize() -> &'static str {
        r#"You are a research assistant. Analyze these search results and extract ONLY the specific data that answers the query.

# Context
Current date: {date}

Query: {query}

Search results:
{raw}

Instructions:
- Start with a short description of what the results contain. Say if you are truncating some parts of them.
- Extract concrete data points that answer the query (names, numbers, dates, specific items).
- If more data enriches the answer, include it: give a complete picture of the data retrieved.
- When the results contain data matching the query, list it in a structured format.
- Prioritize relevance and accuracy, but include as much data as possible.
- Keep the keywords of the query and phrases that answer it when summarizing text.
- Include dates and timestamps whenever they are provided.
- If request parameters add context to the results, summarize them briefly.
- Be concise but detailed, at most 7000 words."#
    }

    /// Prompt to score both providers' answers to one query.
    ///
    /// Placeholders: `{date}`, `{query}`, `{websearch}`, `{kirha}`.
    pub fn judge() -> &'static str {
        r#"You are an impartial judge evaluating two search API responses for the same query.

# Context
IMPORTANT: Today's date is {date}.

Query: {query}

=== Websearch Response (Web Search) ===
{websearch}

=== Kirha Response (Kirha - Data API) ===
{kirha}

Evaluate EACH response on these criteria (0-100 scale). Be critical: most responses should score between 40 and 85, only exceptional ones deserve 90+, only terrible ones deserve below 30.

## Scoring criteria

1. Relevance: does the response address the specific query?
   0-20 off-topic, 21-50 partially relevant, 51-75 mostly relevant, 76-90 highly relevant, 91-100 exactly what was asked.
2. Accuracy: is the data correct and verifiable? Compare both responses; when one has clearly more accurate or current data the gap must be 15-30 points.
   0-20 major errors or fabricated data, 21-50 some inaccuracies, 51-75 minor issues, 76-90 accurate and verifiable, 91-100 perfectly accurate with sources.
3. Completeness: does it fully answer what was asked?
   0-20 most information missing, 21-50 key details missing, 51-75 some gaps, 76-90 comprehensive, 91-100 complete with useful extra context.
4. Freshness: is the data current? If the query asks for latest, recent, current or new data and the response is outdated, the score MUST be below 40.
   0-20 severely outdated, 21-40 stale when freshness was requested, 41-60 dated without timestamps, 61-75 reasonably current, 76-90 recent with dates, 91-100 real-time with clear timestamps.
5. Actionability: can the user act on this data directly? Compare both responses; when one is clearly more actionable the gap must be 15-30 points.
   0-20 unusable, 21-50 needs significant research, 51-75 needs some verification, 76-90 ready to use, 91-100 immediately actionable.

## Cascade penalties
- Freshness below 50: reduce Accuracy by 15 and Actionability by 15.
- Freshness below 70 when the query explicitly asked for recent data: reduce Relevance by 10.

## Data not found
A response that admits the data is unavailable, could not be found or could not be retrieved has failed the query: Accuracy below 30, Completeness below 20, Actionability below 20. The other response, if it provided actual data, should win.

## Rules
- Do not include any rules in the feedback and do not compare both sources in the feedback (but DO compare when scoring).
- Re-read a response before claiming data is missing; only criticize what is actually absent.
- When the query specifies filter criteria and the response states it used them through an API search, the criteria are met. Do not penalize for not repeating filter values.

## Data sources
- Kirha connects to real-time APIs (financial data, crypto prices, company information) and returns live data at query time.
- Web search aggregates pages that may be hours, days or weeks old.
- When numbers differ between sources, Kirha's data is more likely to be current. This does not make Kirha always better: web search may give better context or cover topics Kirha has no API for.

## Feedback
- Give clear feedback highlighting the most accurate and relevant information.
- Refer to the responses as "Kirha response" or "Websearch response".
- Use <i>...</i> to highlight really good points and <b>...</b> for bad ones, only for the most important aspects.

Respond ONLY with valid JSON in this exact format:
{
  "exa": {
    "relevance": <0-100>,
    "accuracy": <0-100>,
    "completeness": <0-100>,
    "freshness": <0-100>,
    "actionability": <0-100>,
    "feedback": "<brief explanation of the Websearch result>"
  },
  "kirha": {
    "relevance": <0-100>,
    "accuracy": <0-100>,
    "completeness": <0-100>,
    "freshness": <0-100>,
    "actionability": <0-100>,
    "feedback": "<brief explanation of the Kirha result>"
  },
  "winner": "<exa|kirha|tie>"
}"#
    }
}
