// LLM prompt templates for the import pipeline.

/// System prompt for text-to-resume extraction. Enforces JSON-only output.
pub const TEXT_TO_RESUME_SYSTEM: &str =
    "You are an expert resume parser. \
    Convert unstructured resume or profile text into structured JSON. \
    Extract only information present in the text. Never invent employers, \
    dates, schools, or skills. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Text-to-resume prompt template. Replace `{target_role}` and `{raw_text}`
/// before sending.
pub const TEXT_TO_RESUME_PROMPT_TEMPLATE: &str = r#"Convert the following text into structured resume content, phrased for a candidate targeting: {target_role}

Return a JSON object with this EXACT schema (omit a field if the text has nothing for it):
{
  "first_name": "string",
  "last_name": "string",
  "email": "string",
  "phone_number": "string",
  "location": "string",
  "website": "string",
  "linkedin_url": "string",
  "github_url": "string",
  "work_experience": [
    {
      "company": "string",
      "position": "string",
      "location": "string",
      "date": "string, as written in the text (e.g. 'Jan 2020 - Present')",
      "description": ["one bullet per accomplishment, kept factual"],
      "technologies": ["string"]
    }
  ],
  "education": [
    {
      "school": "string",
      "degree": "string",
      "field": "string",
      "location": "string",
      "date": "string",
      "gpa": 3.8,
      "achievements": ["string"]
    }
  ],
  "skills": [
    {"category": "string, e.g. 'Languages'", "items": ["string"]}
  ],
  "projects": [
    {
      "name": "string",
      "description": ["string"],
      "technologies": ["string"],
      "url": "string",
      "github_url": "string",
      "date": "string"
    }
  ]
}

RULES:
1. Use ONLY facts from the input text, with no interpolation or invention
2. Keep dates exactly as written; do not reformat them
3. Group every skill mention into a category; create categories as needed
4. Preserve the order entries appear in the text
5. Return ONLY the JSON object, with no surrounding text and no code fences

INPUT TEXT:
{raw_text}"#;
