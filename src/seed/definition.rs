// src/seed/definition.rs

//! The fixed MAR questionnaire. Order numbers are the 1-based positions below.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scale {
    Agreement,
    Frequency,
}

impl Scale {
    /// Option labels, lowest value first. Values are 1..=5.
    pub fn options(self) -> &'static [&'static str] {
        match self {
            Scale::Agreement => &[
                "Discordo totalmente",
                "Discordo parcialmente",
                "Neutro",
                "Concordo parcialmente",
                "Concordo totalmente",
            ],
            Scale::Frequency => &["Nunca", "Raramente", "Às vezes", "Frequentemente", "Sempre"],
        }
    }
}

pub struct QuestionDef {
    pub text: &'static str,
    pub scale: Scale,
}

pub struct ModuleDef {
    pub title: &'static str,
    pub description: &'static str,
    pub questions: &'static [QuestionDef],
}

pub const EXPECTED_MODULES: usize = 6;
pub const EXPECTED_QUESTIONS: usize = 44;

const fn agree(text: &'static str) -> QuestionDef {
    QuestionDef { text, scale: Scale::Agreement }
}

const fn freq(text: &'static str) -> QuestionDef {
    QuestionDef { text, scale: Scale::Frequency }
}

pub static QUIZ: &[ModuleDef] = &[
    ModuleDef {
        title: "Autoconhecimento",
        description: "Como você percebe suas forças, limites e valores.",
        questions: &[
            agree("Conheço bem minhas principais qualidades."),
            agree("Consigo identificar meus pontos de melhoria sem me culpar."),
            agree("Tenho clareza sobre os valores que guiam minhas decisões."),
            freq("Reflito sobre minhas atitudes depois de uma situação difícil."),
            agree("Sei o que me motiva a agir no dia a dia."),
            freq("Peço feedback a pessoas de confiança."),
            agree("Reconheço quando estou agindo contra o que acredito."),
            agree("Me sinto confortável em dizer não quando necessário."),
        ],
    },
    ModuleDef {
        title: "Gestão Emocional",
        description: "Como você lida com emoções e pressão.",
        questions: &[
            freq("Percebo minhas emoções no momento em que elas surgem."),
            freq("Consigo me acalmar depois de um momento de raiva ou frustração."),
            freq("Sinto ansiedade que atrapalha minhas atividades."),
            agree("Lido bem com críticas, mesmo quando discordo delas."),
            freq("Durmo mal por causa de preocupações."),
            agree("Sei pedir ajuda quando estou sobrecarregado."),
            freq("Tomo decisões importantes por impulso."),
            agree("Consigo manter o foco sob pressão."),
        ],
    },
    ModuleDef {
        title: "Relacionamentos",
        description: "A qualidade das suas relações pessoais e profissionais.",
        questions: &[
            agree("Tenho pessoas com quem posso contar em momentos difíceis."),
            freq("Escuto os outros sem interromper ou julgar."),
            agree("Consigo expressar discordância de forma respeitosa."),
            freq("Dedico tempo de qualidade às pessoas que amo."),
            agree("Resolvo conflitos em vez de evitá-los."),
            agree("Me sinto valorizado nas minhas relações."),
            freq("Mantenho contato com amigos mesmo na correria."),
        ],
    },
    ModuleDef {
        title: "Propósito e Carreira",
        description: "Alinhamento entre trabalho, talentos e sentido.",
        questions: &[
            agree("Meu trabalho tem significado para mim."),
            agree("Uso meus talentos na maior parte do meu tempo produtivo."),
            agree("Tenho metas profissionais claras para os próximos anos."),
            freq("Invisto no meu próprio desenvolvimento."),
            agree("Me sinto reconhecido pelo que entrego."),
            agree("Vejo oportunidades de crescimento onde estou hoje."),
            freq("Sinto que estou no caminho certo profissionalmente."),
        ],
    },
    ModuleDef {
        title: "Hábitos e Saúde",
        description: "Rotina, energia e cuidado com o corpo.",
        questions: &[
            freq("Pratico atividade física ao longo da semana."),
            freq("Tenho uma alimentação equilibrada."),
            freq("Durmo o suficiente para me sentir descansado."),
            agree("Minha rotina me ajuda a cumprir minhas prioridades."),
            freq("Reservo momentos de lazer e descanso."),
            freq("Faço pausas durante o trabalho."),
            agree("Tenho energia suficiente para o meu dia."),
        ],
    },
    ModuleDef {
        title: "Visão de Futuro",
        description: "Planejamento, otimismo e disposição para mudar.",
        questions: &[
            agree("Tenho uma visão clara de onde quero estar em cinco anos."),
            agree("Acredito que posso mudar aspectos importantes da minha vida."),
            freq("Planejo minhas finanças pensando no futuro."),
            agree("Encaro mudanças como oportunidades."),
            freq("Transformo planos em ações concretas."),
            agree("Sinto-me otimista em relação ao futuro."),
            agree("Estou disposto a sair da zona de conforto para crescer."),
        ],
    },
];

pub fn question_count() -> usize {
    QUIZ.iter().map(|m| m.questions.len()).sum()
}

pub fn option_count() -> usize {
    QUIZ.iter()
        .flat_map(|m| m.questions.iter())
        .map(|q| q.scale.options().len())
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn definition_has_the_expected_shape() {
        assert_eq!(QUIZ.len(), EXPECTED_MODULES);
        assert_eq!(question_count(), EXPECTED_QUESTIONS);
        assert_eq!(option_count(), EXPECTED_QUESTIONS * 5);
    }

    #[test]
    fn every_question_has_text_and_five_options() {
        for module in QUIZ {
            assert!(!module.title.is_empty());
            assert!(!module.questions.is_empty());
            for question in module.questions {
                assert!(!question.text.trim().is_empty());
                assert_eq!(question.scale.options().len(), 5);
            }
        }
    }

    #[test]
    fn question_texts_are_unique() {
        let mut texts: Vec<&str> = QUIZ
            .iter()
            .flat_map(|m| m.questions.iter().map(|q| q.text))
            .collect();
        texts.sort_unstable();
        texts.dedup();
        assert_eq!(texts.len(), EXPECTED_QUESTIONS);
    }
}
