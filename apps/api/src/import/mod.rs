// Import pipeline: unstructured text (pasted, PDF-extracted, or fetched
// LinkedIn profile JSON) is normalized into resume-shaped content by one
// model call. All model traffic goes through llm_client; nothing here talks
// to a provider directly.

pub mod handlers;
pub mod linkedin;
pub mod normalize;
pub mod pdf;
pub mod prompts;
pub mod rate_limit;
