pub fn build_extraction_prompt(schema: &str, query: &str) -> String {
    format!(
        r#"Extract the information needed to build a graph query for the question below.

QUESTION: {query}

SCHEMA:
{schema}

INSTRUCTIONS:
1. Identify the node types the question refers to and any properties it states
2. Identify the relationships needed to connect those nodes
3. Build a path between the nodes using only relationships from the schema
4. Keep any identifiers the question mentions exactly as written
5. Relationships are directed: (source)-[predicate]->(target)

RULES:
- Use only node types and relationships that appear in the schema
- Never reverse or invent a relationship
- Every node used by a relationship must be listed
- Only add a property when the question states its value
- Never take property values from the schema or infer identifiers

OUTPUT FORMAT:
Relevant Nodes:
- Node Type: `node_type`
  - ID: `specific_id_or_empty`
  - Properties:
    - key: value

Relevant Relationships:
1. Start Node: `node_type` (ID: `id_or_empty`)
   Predicate: `relationship_from_schema`
   End Node: `node_type` (ID: `id_or_empty`)"#
    )
}

pub fn build_conversion_prompt(schema: &str, query: &str, extracted: &str) -> String {
    format!(
        r#"Convert the extracted information into the JSON query format defined by the schema.

QUESTION: {query}

EXTRACTED INFORMATION:
{extracted}

SCHEMA:
{schema}

RULES:
- Give every node a unique node_id of the form "type_N"
- List every node that appears in a predicate in "nodes"
- Predicate types must match the schema exactly
- Do not add anything that is not in the extracted information
- Output ONLY the JSON object, no markdown, no explanations

JSON FORMAT:
{{
  "nodes": [
    {{"node_id": "gene_1", "id": "id_or_empty", "type": "gene", "properties": {{"key": "value"}}}},
    {{"node_id": "transcript_1", "id": "", "type": "transcript", "properties": {{}}}}
  ],
  "predicates": [
    {{"type": "predicate", "source": "gene_1", "target": "transcript_1"}}
  ]
}}

JSON OUTPUT:"#
    )
}

pub fn build_retry_prompt(invalid_json: &str) -> String {
    format!(
        r#"The following JSON is invalid:

{}

Fix this JSON. Output only valid JSON with no markdown formatting, no code blocks, no explanations. Just the raw JSON object."#,
        invalid_json
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompts_embed_inputs() {
        let schema = "(gene)-[transcribed_to]->(transcript)";
        let extraction = build_extraction_prompt(schema, "which transcripts does TP53 have?");
        assert!(extraction.contains(schema));
        assert!(extraction.contains("which transcripts does TP53 have?"));

        let conversion = build_conversion_prompt(schema, "q", "Node Type: `gene`");
        assert!(conversion.contains("Node Type: `gene`"));
        assert!(conversion.contains("\"predicates\""));
    }
}
