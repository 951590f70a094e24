/// URL 历史的抽象
///
/// 查询串不带前导 `?`
pub trait NavigationPort: Send {
    /// 当前地址的查询串
    fn current_query(&self) -> String;

    /// 新增一条历史记录
    fn push(&mut self, query: &str);

    /// 替换当前历史记录
    fn replace(&mut self, query: &str);
}

/// 内存中的历史栈，支持前进 / 后退
#[derive(Debug, Clone)]
pub struct MemoryHistory {
    entries: Vec<String>,
    index: usize,
    writes: usize,
}

impl MemoryHistory {
    pub fn new(initial_query: &str) -> Self {
        Self {
            entries: vec![strip_question_mark(initial_query).to_string()],
            index: 0,
            writes: 0,
        }
    }

    /// 后退一步，相当于浏览器触发 popstate
    pub fn back(&mut self) -> bool {
        if self.index == 0 {
            return false;
        }
        self.index -= 1;
        true
    }

    /// 前进一步
    pub fn forward(&mut self) -> bool {
        if self.index + 1 >= self.entries.len() {
            return false;
        }
        self.index += 1;
        true
    }

    /// 模拟用户手动修改地址栏（不计入写入次数）
    pub fn edit_externally(&mut self, query: &str) {
        self.entries[self.index] = strip_question_mark(query).to_string();
    }

    /// 历史记录条数，至少为 1
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// push / replace 的总次数
    pub fn write_count(&self) -> usize {
        self.writes
    }
}

impl Default for MemoryHistory {
    fn default() -> Self {
        Self::new("")
    }
}

impl NavigationPort for MemoryHistory {
    fn current_query(&self) -> String {
        self.entries[self.index].clone()
    }

    fn push(&mut self, query: &str) {
        // 新记录会截断前进方向的历史
        self.entries.truncate(self.index + 1);
        self.entries.push(strip_question_mark(query).to_string());
        self.index = self.entries.len() - 1;
        self.writes += 1;
    }

    fn replace(&mut self, query: &str) {
        self.entries[self.index] = strip_question_mark(query).to_string();
        self.writes += 1;
    }
}

fn strip_question_mark(query: &str) -> &str {
    query.strip_prefix('?').unwrap_or(query)
}
