//! Prompt templates sent to the language model.
//!
//! Both analysis prompts ask for the same judgment shape: one entry per unit with
//! `probability` (0-100) and `explanation`, plus an `analise_geral` entry.

/// Key of the overall judgment both channel prompts ask for.
pub const OVERALL_KEY: &str = "analise_geral";

pub fn sanitize_prompt(raw_text: &str) -> String {
    format!(
        r#"O texto abaixo foi extraído de uma imagem por OCR e pode conter erros de reconhecimento, quebras de linha fora do lugar, caracteres soltos e palavras coladas.

Reescreva o texto de forma coerente:
1 - Corrija erros evidentes de OCR e de ortografia.
2 - Junte linhas quebradas que pertencem à mesma frase.
3 - Remova caracteres e símbolos que claramente são ruído.
4 - NÃO acrescente, resuma ou interprete o conteúdo.

Retorne APENAS o texto corrigido, sem comentários, sem markdown.

Texto extraído:
{raw_text}"#
    )
}

pub fn text_channel_prompt(text: &str) -> String {
    format!(
        r#"Você é um analista de credibilidade de conteúdo publicado em redes sociais.

Divida o texto abaixo em frases. Para CADA frase, avalie a probabilidade (0 a 100) de ela ser um meme, piada ou sátira em vez de uma afirmação séria, e explique o motivo.
Depois, faça uma análise geral considerando todas as frases em conjunto.

Responda SOMENTE com um objeto JSON puro, sem markdown e sem texto antes ou depois, no formato:
{{
  "frase_1": {{ "texto": "...", "probability": 0, "explanation": "..." }},
  "frase_2": {{ "texto": "...", "probability": 0, "explanation": "..." }},
  "{OVERALL_KEY}": {{ "probability": 0, "explanation": "..." }}
}}

Texto:
{text}"#
    )
}

pub fn image_channel_prompt() -> String {
    format!(
        r#"Você é um analista de credibilidade de imagens publicadas em redes sociais.

Analise APENAS os elementos visuais da imagem anexada: composição, montagem, edição, expressões, estilo gráfico, marcas d'água e formato típico de memes.
IGNORE completamente qualquer texto, frase ou legenda presente na imagem; eles são avaliados separadamente.

Identifique os elementos visuais relevantes. Para CADA elemento, avalie a probabilidade (0 a 100) de a imagem ser um meme em vez de um registro sério, e explique o motivo.
Depois, faça uma análise geral considerando todos os elementos em conjunto.

Responda SOMENTE com um objeto JSON puro, sem markdown e sem texto antes ou depois, no formato:
{{
  "elemento_1": {{ "descricao": "...", "probability": 0, "explanation": "..." }},
  "elemento_2": {{ "descricao": "...", "probability": 0, "explanation": "..." }},
  "{OVERALL_KEY}": {{ "probability": 0, "explanation": "..." }}
}}"#
    )
}

/// Free-form credibility question used by `/generate` and the CLI.
pub fn credibility_prompt(user_text: &str) -> String {
    format!(
        r#"me diga pra mim a probabilidade das seguintes palavras serem um meme ou serem uma abordagem séria: {user_text}

Por favor, retorne uma métrica de credibilidade de 1 (muito falso) a 5 (muito verdadeiro) para avaliar a credibilidade do texto."#
    )
}
