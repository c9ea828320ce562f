//! Strategic remark pools attached to every article.
//!
//! Each article gets one "importance" and one "insight" string drawn
//! uniformly from fixed pools. The draw goes through [`RemarkPicker`], whose
//! random source can be seeded so runs and tests are reproducible.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;

pub const DEFAULT_IMPORTANCE: &[&str] = &[
    "이 이슈는 아이스크림미디어의 기존 에듀테크 사업 모델에 직접적인 영향을 줄 수 있는 중요한 변화입니다. 특히 공교육 디지털 전환 정책과 맞물려 시장의 판도가 바뀔 가능성이 높으므로, 경쟁사의 대응 현황을 면밀히 모니터링하고 자사의 차별화된 기술력(AI 튜터 등)을 부각할 수 있는 방안을 모색해야 합니다.",
    "최근 교육 현장에서의 요구 사항이 반영된 뉴스로, 향후 플랫폼 고도화 방향 설정에 있어 중요한 참고 지표가 될 것입니다. 단순한 기능 제공을 넘어 교사와 학생의 실질적인 페인 포인트(Pain Point)를 해결해 줄 수 있는 솔루션으로서의 가치를 증명해야 하는 시점입니다.",
    "글로벌 빅테크 기업들의 교육 시장 진출 가속화와 맥락을 같이 하는 뉴스입니다. 이는 단기적으로는 경쟁 심화를 의미하지만, 장기적으로는 AI 기반 맞춤형 학습 시장의 전체 파이(Total Addressable Market)가 커지고 있음을 시사하므로 적극적인 투자가 필요합니다.",
    "정부 규제 및 표준화 움직임과 관련이 깊습니다. 특히 최근 강조되고 있는 'AI 디지털 교과서'의 법적 기준이나 윤리적 가이드라인 준수 여부가 쟁점이 될 수 있으므로, 선제적인 컴플라이언스 점검과 대관 업무 강화가 요구되는 시점입니다.",
];

pub const DEFAULT_INSIGHT: &[&str] = &[
    "기획/개발 팀은 해당 뉴스에 언급된 기술적 기능(기능명, UX 동선 등)을 벤치마킹하여 차기 업데이트 로드맵에 반영하십시오. 특히 사용자 경험(UX) 측면에서 교사의 업무 경감을 돕는 자동화 기능이 강조되고 있음에 주목해야 합니다.",
    "마케팅 팀은 본 기사의 핵심 키워드를 활용하여 아이스크림미디어의 브랜드 메시지를 다듬어야 합니다. '선생님을 위한 AI', '안전한 에듀테크' 등의 키워드와 연계하여 자사 서비스의 신뢰도를 높이는 콘텐츠(카드뉴스, 아티클) 발행을 검토해 보시기 바랍니다.",
    "영업 및 현장 지원 부서에서는 일선 학교 방문 시 이 이슈를 스몰토크 주제로 활용하여 교사들의 실제 반응을 수집하십시오. 현장의 목소리가 제품 개선으로 이어지는 선순환 구조를 만들기 위해, 수집된 피드백을 주간 회의에서 반드시 공유해야 합니다.",
];

/// The two string pools, overridable from the `[remarks]` config table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RemarkPool {
    pub importance: Vec<String>,
    pub insight: Vec<String>,
}

impl Default for RemarkPool {
    fn default() -> Self {
        Self {
            importance: DEFAULT_IMPORTANCE.iter().map(|s| s.to_string()).collect(),
            insight: DEFAULT_INSIGHT.iter().map(|s| s.to_string()).collect(),
        }
    }
}

pub struct RemarkPicker {
    pool: RemarkPool,
    rng: StdRng,
}

impl RemarkPicker {
    /// A seeded picker replays the same sequence of picks; without a seed the
    /// generator is initialised from OS entropy.
    pub fn new(pool: RemarkPool, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { pool, rng }
    }

    /// Draws `(importance, insight)`. An empty pool contributes `""`.
    pub fn pick(&mut self) -> (String, String) {
        let importance = choose(&mut self.rng, &self.pool.importance);
        let insight = choose(&mut self.rng, &self.pool.insight);
        (importance, insight)
    }
}

fn choose(rng: &mut StdRng, pool: &[String]) -> String {
    if pool.is_empty() {
        return String::new();
    }
    pool[rng.gen_range(0..pool.len())].clone()
}
