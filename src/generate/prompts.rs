//! Prompts for the analysis and solution stages.
//!
//! The solution prompts spell out the exact block headings and fences the
//! document parser recognizes. They are rendered from the parser's grammar
//! tables so the two cannot drift apart.

use crate::defaults;
use crate::document::parser::{DIAGRAM_GRAMMAR, DiagramKind, INFRA_GRAMMAR};
use crate::generate::service::GenerationSettings;
use crate::request::Platform;

/// Model choice, sampling settings and prompt builder for one platform.
#[derive(Debug, Clone)]
pub struct PlatformProfile {
    pub platform: Platform,
    pub model: &'static str,
    pub settings: Option<GenerationSettings>,
    pub build_prompt: fn(&str) -> String,
}

impl PlatformProfile {
    pub fn for_platform(platform: Platform) -> Self {
        match platform {
            Platform::Azure => Self {
                platform,
                model: "gemini-1.5-flash",
                settings: None,
                build_prompt: azure_solution_prompt,
            },
            Platform::Aws => Self {
                platform,
                model: "gemini-1.5-pro",
                settings: Some(GenerationSettings {
                    temperature: Some(0.6),
                    top_p: Some(1.0),
                    top_k: Some(32),
                    max_output_tokens: Some(8192),
                    response_mime_type: Some("text/plain".to_string()),
                }),
                build_prompt: aws_solution_prompt,
            },
            Platform::Gcp => Self {
                platform,
                model: "gemini-1.5-flash",
                settings: None,
                build_prompt: gcp_solution_prompt,
            },
        }
    }

    pub fn prompt(&self, transcript: &str) -> String {
        (self.build_prompt)(transcript)
    }
}

/// Prompt asking for a structured business-problem analysis of a transcript.
pub fn analysis_prompt(transcript: &str) -> String {
    format!(
        "Você é um analista de negócios e sintetizador de informações altamente proficiente. \
Seu objetivo é analisar profundamente transcrições de áudio (reuniões, palestras, discussões) \
e extrair as informações mais relevantes, considerando os seguintes elementos essenciais:\n\n\
1.  **Problema/Situação Central:**\n\
    * Apresente o objetivo da solução em discussão, de forma clara e direta.\n\
    * Qual é o problema ou a situação principal que está sendo abordada?\n\
    * Quais são os pontos-chave discutidos que levam a essa situação?\n\n\
2.  **Entendimento Detalhado:**\n\
    * Apresente um resumo abrangente do contexto e do estado atual da discussão.\n\
    * Quais são os principais tópicos, conceitos ou informações apresentadas?\n\n\
3.  **Premissas (Claras e Ocultas):**\n\
    * **Premissas Explícitas:** suposições declaradas ou fatos considerados verdadeiros.\n\
    * **Premissas Implícitas/Ocultas:** suposições não declaradas que parecem estar em jogo.\n\n\
4.  **Restrições (Técnicas, Orçamentárias, Temporais, etc.):**\n\
    * Limitações claramente identificadas (orçamento, prazo, recursos, tecnologia, políticas internas).\n\
    * Restrições sugeridas ou subentendidas que são evidentes na discussão.\n\n\
5.  **Partes Interessadas (Stakeholders) e suas Perspectivas:**\n\
    * Quem são os principais participantes mencionados ou implicitamente relevantes?\n\
    * Quais são as perspectivas, preocupações ou interesses de cada parte interessada?\n\n\
6.  **Próximos Passos/Ações Sugeridas (se houver):**\n\
    * Quais ações, decisões ou recomendações surgiram da discussão?\n\n\
7.  **Pontos de Dúvida/Esclarecimento Necessário:**\n\
    * Quais áreas permanecem ambíguas, contraditórias ou requerem mais informações?\n\n\
**Formato da Saída:**\n\
Texto estruturado em Markdown, com cabeçalhos e listas organizando as informações de forma lógica.\n\n\
**Instruções Adicionais:**\n\
* Seja objetivo e imparcial na extração de informações.\n\
* Concentre-se em sintetizar, não apenas em repetir.\n\
* Se alguma seção não for aplicável, indique-o claramente \
(ex: 'Nenhuma premissa oculta clara identificada').\n\n\
Transcrição:\n{transcript}"
    )
}

/// Platform-specific vocabulary the shared solution template is filled with.
struct PlatformTerms {
    name: &'static str,
    framework: &'static str,
    compute: &'static str,
    api: &'static str,
    data: &'static str,
    messaging: &'static str,
    identity: &'static str,
    observability: &'static str,
    secrets: &'static str,
    /// Terraform provider block for `providers.tf`.
    provider: &'static str,
    /// `required_providers` entry for `versions.tf`.
    required_provider: &'static str,
}

const AZURE_TERMS: PlatformTerms = PlatformTerms {
    name: "Microsoft Azure",
    framework: "Azure Well-Architected Framework",
    compute: "Azure Kubernetes Service (AKS) e Azure Container Apps",
    api: "Azure API Management",
    data: "Azure SQL Database, Cosmos DB",
    messaging: "Azure Service Bus, Event Grid",
    identity: "Microsoft Entra ID",
    observability: "Azure Monitor, Application Insights",
    secrets: "Azure Key Vault",
    provider: "provider \"azurerm\" {\n  features {}\n}",
    required_provider: "azurerm = {\n      source  = \"hashicorp/azurerm\"\n      version = \"~> 3.0\"\n    }",
};

const AWS_TERMS: PlatformTerms = PlatformTerms {
    name: "Amazon Web Services (AWS)",
    framework: "AWS Well-Architected Framework",
    compute: "Amazon EKS e AWS Fargate",
    api: "Amazon API Gateway",
    data: "Amazon RDS, DynamoDB",
    messaging: "Amazon SQS, Amazon SNS, EventBridge",
    identity: "AWS IAM, Amazon Cognito",
    observability: "Amazon CloudWatch, AWS X-Ray",
    secrets: "AWS Secrets Manager",
    provider: "provider \"aws\" {\n  region = var.region\n}",
    required_provider: "aws = {\n      source  = \"hashicorp/aws\"\n      version = \"~> 5.0\"\n    }",
};

const GCP_TERMS: PlatformTerms = PlatformTerms {
    name: "Google Cloud Platform (GCP)",
    framework: "Google Cloud Architecture Framework",
    compute: "Google Kubernetes Engine (GKE) e Cloud Run",
    api: "API Gateway, Apigee",
    data: "Cloud SQL, Firestore, BigQuery",
    messaging: "Cloud Pub/Sub, Cloud Tasks",
    identity: "Cloud IAM, Identity Platform",
    observability: "Cloud Monitoring, Cloud Logging, Cloud Trace",
    secrets: "Secret Manager",
    provider: "provider \"google\" {\n  project = var.project_id\n  region  = var.region\n}",
    required_provider: "google = {\n      source  = \"hashicorp/google\"\n      version = \"~> 5.0\"\n    }",
};

fn azure_solution_prompt(transcript: &str) -> String {
    solution_prompt(&AZURE_TERMS, transcript)
}

fn aws_solution_prompt(transcript: &str) -> String {
    solution_prompt(&AWS_TERMS, transcript)
}

fn gcp_solution_prompt(transcript: &str) -> String {
    solution_prompt(&GCP_TERMS, transcript)
}

/// Example diagram body shown under each heading.
fn diagram_example(kind: DiagramKind) -> &'static str {
    match kind {
        DiagramKind::Context => {
            "@startuml <NomeDoDiagrama>\n\
!include https://raw.githubusercontent.com/plantuml-stdlib/C4-PlantUML/master/C4_Context.puml\n\
title Diagrama de Contexto do Sistema: [Nome do Projeto]\n\
Person(user, \"Usuário\")\n\
System(system, \"[Nome do Sistema]\")\n\
Rel(user, system, \"Utiliza\", \"HTTPS\")\n\
@enduml"
        }
        DiagramKind::Container => {
            "@startuml <NomeDoDiagrama>\n\
!include https://raw.githubusercontent.com/plantuml-stdlib/C4-PlantUML/master/C4_Container.puml\n\
title Diagrama de Contêineres: [Nome do Projeto]\n\
System_Boundary(c4_system, \"[Nome do Sistema]\") {\n\
  Container(api, \"API Gateway\", \"[serviço]\")\n\
  ContainerDb(db, \"Banco de Dados\", \"[serviço]\")\n\
}\n\
@enduml"
        }
        DiagramKind::Component => {
            "@startuml <NomeDoDiagrama>\n\
!include https://raw.githubusercontent.com/plantuml-stdlib/C4-PlantUML/master/C4_Component.puml\n\
title Diagrama de Componentes: [Microsserviço]\n\
Container_Boundary(core, \"Microsserviços Core\") {\n\
  Component(orders, \"Serviço de Pedidos\", \"REST API\")\n\
}\n\
@enduml"
        }
        DiagramKind::Sequence => {
            "@startuml <NomeDoDiagrama>\n\
title Fluxo Principal\n\
participant \"Cliente\" as Cliente\n\
participant \"API Gateway\" as Gateway\n\
Cliente -> Gateway: Requisição (HTTPS)\n\
@enduml"
        }
    }
}

fn terraform_examples(terms: &PlatformTerms) -> Vec<(&'static str, String)> {
    vec![
        (
            "versions.tf",
            format!(
                "terraform {{\n  required_providers {{\n    {}\n  }}\n  required_version = \">= 1.0.0\"\n}}",
                terms.required_provider
            ),
        ),
        ("providers.tf", terms.provider.to_string()),
        (
            "variables.tf",
            "variable \"region\" {\n  description = \"Região principal.\"\n  type        = string\n}"
                .to_string(),
        ),
        ("main.tf", "# Recursos principais da solução".to_string()),
        ("outputs.tf", "# Saídas relevantes da infraestrutura".to_string()),
    ]
}

fn solution_prompt(terms: &PlatformTerms, transcript: &str) -> String {
    let mut prompt = format!(
        "Você é uma inteligência artificial especializada em arquitetura de soluções em nuvem. \
Sua missão PRINCIPAL é analisar as informações fornecidas (que vêm de uma análise de transcrição \
de reuniões de negócios) e gerar uma proposta de solução técnica detalhada, **aderindo \
estritamente à plataforma cloud {name} e incluindo scripts Terraform para a infraestrutura**.\n\n\
**Sua resposta DEVE seguir rigorosamente a seguinte estrutura, com seções de texto, PlantUML e \
Terraform separadas por cabeçalhos específicos para facilitar a extração:**\n\n\
---\n\n\
### Proposta de Solução Técnica: Projeto [Nome do Projeto - inferir da transcrição] em {name}\n\n\
**1. Análise do Problema e Requisitos:** resumo do problema, requisitos funcionais e não \
funcionais, modelos de autenticação, autorização e integração.\n\n\
**2. Premissas de Negócio Essenciais:** premissas que a solução deve respeitar.\n\n\
**3. Diretrizes Corporativas ({name}):** todo novo serviço computacional deve ser implantado \
exclusivamente em {name}, usando preferencialmente serviços nativos. Priorize contêineres \
gerenciados ({compute}).\n\n\
**4. Visão Geral da Solução:** abordagem geral, aderência aos pilares do {framework} e padrão \
de arquitetura adotado, preferencialmente **Microsserviços**.\n\n\
**5. Componentes da Solução e sua Relação com o Problema:** para cada componente, nome, relação \
com o problema e contribuição para o {framework}. Cubra hospedagem ({compute}), gerenciamento \
de APIs ({api}), bancos de dados ({data}), comunicação assíncrona ({messaging}), identidades \
({identity}), monitoramento ({observability}) e segredos ({secrets}).\n\n\
**6. Segurança e Conformidade (PCI SSC):** como a solução atende aos padrões PCI DSS quando \
houver dados sensíveis.\n\n\
**7. Geração de Diagramas PlantUML:** gere o código para cada diagrama abaixo, usando \
exatamente estes cabeçalhos e blocos ```{diagram_tag}:\n\n",
        name = terms.name,
        framework = terms.framework,
        compute = terms.compute,
        api = terms.api,
        data = terms.data,
        messaging = terms.messaging,
        identity = terms.identity,
        observability = terms.observability,
        secrets = terms.secrets,
        diagram_tag = DIAGRAM_GRAMMAR.fence_tag,
    );

    for kind in DiagramKind::ALL {
        prompt.push_str(&DIAGRAM_GRAMMAR.template(kind.heading_name(), diagram_example(kind)));
        prompt.push('\n');
    }

    prompt.push_str(&format!(
        "**8. Infraestrutura como Código:** gere um bloco por arquivo Terraform, usando exatamente \
estes cabeçalhos e blocos ```{}, com nomes de arquivo no formato <nome>.tf:\n\n",
        INFRA_GRAMMAR.fence_tag
    ));
    for (file_name, body) in terraform_examples(terms) {
        prompt.push_str(&INFRA_GRAMMAR.template(file_name, &body));
        prompt.push('\n');
    }

    prompt.push_str(&format!("Transcrição analisada:\n{transcript}"));
    prompt
}

/// Prompt prefix suitable for a debug log line.
pub fn log_preview(prompt: &str) -> String {
    prompt.chars().take(defaults::PROMPT_LOG_CHARS).collect()
}
