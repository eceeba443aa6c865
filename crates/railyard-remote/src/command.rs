//! 型付きリモートコマンドビルダー
//!
//! コマンドは引数リストとして組み立て、最後にだけシェル文字列へ変換する。
//! 各引数は必要に応じてクォートされる。ステップは `&&` で連結され、
//! 最初に失敗したステップでそのホストのチェーンは止まる。

use std::fmt;

/// ステップの引数1つ
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arg {
    /// リテラルの単語（シェルのメタ文字を含む場合はクォート）
    Literal(String),
    /// ホスト上のファイルから読むPID: `"$(cat <path>)"`
    PidFrom(String),
}

impl Arg {
    fn render(&self) -> String {
        match self {
            Arg::Literal(s) => shell_quote(s),
            Arg::PidFrom(path) => format!("\"$(cat {})\"", shell_quote(path)),
        }
    }

    /// リテラル文字列。置換の場合は `None`
    pub fn as_literal(&self) -> Option<&str> {
        match self {
            Arg::Literal(s) => Some(s),
            Arg::PidFrom(_) => None,
        }
    }
}

/// チェーン内の1つのプログラム呼び出し
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Step {
    env: Vec<(String, String)>,
    args: Vec<Arg>,
    stdout_to: Option<String>,
}

impl Step {
    fn program(program: impl Into<String>) -> Self {
        Self {
            args: vec![Arg::Literal(program.into())],
            ..Default::default()
        }
    }

    pub fn args(&self) -> &[Arg] {
        &self.args
    }

    pub fn env(&self) -> &[(String, String)] {
        &self.env
    }

    /// ステップのリテラル単語（置換は除く）
    pub fn words(&self) -> Vec<&str> {
        self.args.iter().filter_map(Arg::as_literal).collect()
    }

    fn render(&self) -> String {
        let mut parts: Vec<String> = self
            .env
            .iter()
            .map(|(k, v)| format!("{}={}", k, shell_quote(v)))
            .collect();
        parts.extend(self.args.iter().map(Arg::render));
        if let Some(path) = &self.stdout_to {
            parts.push(">".to_string());
            parts.push(shell_quote(path));
        }
        parts.join(" ")
    }
}

/// リモートシェルで実行するコマンドチェーン
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteCommand {
    steps: Vec<Step>,
    run_as: Option<String>,
}

impl RemoteCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            steps: vec![Step::program(program)],
            run_as: None,
        }
    }

    /// `cd <dir>` でチェーンを開始
    pub fn in_dir(dir: impl Into<String>) -> Self {
        Self::new("cd").arg(dir)
    }

    /// 現在のステップに引数を追加
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.current().args.push(Arg::Literal(arg.into()));
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let step = self.current();
        step.args
            .extend(args.into_iter().map(|a| Arg::Literal(a.into())));
        self
    }

    /// `path` に保存されたPIDを引数として追加
    pub fn pid_from(mut self, path: impl Into<String>) -> Self {
        self.current().args.push(Arg::PidFrom(path.into()));
        self
    }

    /// 現在のステップに環境変数を設定
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.current().env.push((key.into(), value.into()));
        self
    }

    /// 現在のステップの標準出力をファイルへリダイレクト
    pub fn stdout_to(mut self, path: impl Into<String>) -> Self {
        self.current().stdout_to = Some(path.into());
        self
    }

    /// `&&` で別のプログラムを連結
    pub fn then(mut self, program: impl Into<String>) -> Self {
        self.steps.push(Step::program(program));
        self
    }

    /// `sudo -u <user> sh -c` でチェーン全体を `user` として実行
    pub fn run_as(mut self, user: impl Into<String>) -> Self {
        self.run_as = Some(user.into());
        self
    }

    /// 条件付きで `user` として実行
    pub fn run_as_if(self, condition: bool, user: &str) -> Self {
        if condition { self.run_as(user) } else { self }
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn runs_as(&self) -> Option<&str> {
        self.run_as.as_deref()
    }

    /// ホストに送るシェル文字列
    pub fn render(&self) -> String {
        let chain = self
            .steps
            .iter()
            .map(Step::render)
            .collect::<Vec<_>>()
            .join(" && ");

        match &self.run_as {
            Some(user) => format!(
                "sudo -u {} sh -c {}",
                shell_quote(user),
                shell_quote(&chain)
            ),
            None => chain,
        }
    }

    fn current(&mut self) -> &mut Step {
        if self.steps.is_empty() {
            self.steps.push(Step::default());
        }
        let last = self.steps.len() - 1;
        &mut self.steps[last]
    }
}

impl fmt::Display for RemoteCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// 必要な場合のみ POSIX sh 用にクォート
pub fn shell_quote(s: &str) -> String {
    let safe = !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || "_-./:@%+=,".contains(c));
    if safe {
        s.to_string()
    } else {
        format!("'{}'", s.replace('\'', "'\\''"))
    }
}
