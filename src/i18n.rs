#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Language {
    #[default]
    En,
    Zh,
}

impl Language {
    pub fn from_str(s: &str) -> Self {
        let s = s.to_lowercase();
        if s.starts_with("zh") {
            Language::Zh
        } else {
            Language::En
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum MessageKey {
    WelcomeChat,
    WelcomeRun,
    PromptUser,
    PromptInstruction,
    PromptConfirm,
    ConfirmHint,
    Copied,
    Deleted,
    Saved,
    ClipboardEmpty,
    ActiveProfile,
    ActiveModel,
    ExitedWithCode,
    NoLastCommand,
    Opening,
    SnapshotFailed,
    SaveFailed,
    ViewFailed,
}

pub fn t(lang: &Language, key: MessageKey) -> &'static str {
    match (lang, key) {
        (Language::En, MessageKey::WelcomeChat) => {
            "[chat] /q quits, /cp copies, /del deletes, /pb pastes, /save saves, /view shows."
        }
        (Language::Zh, MessageKey::WelcomeChat) => {
            "[chat] /q 退出，/cp 复制，/del 删除，/pb 粘贴，/save 保存，/view 查看。"
        }

        (Language::En, MessageKey::WelcomeRun) => {
            "[run] Describe what to do. /r repeats the last command, /q quits."
        }
        (Language::Zh, MessageKey::WelcomeRun) => "[run] 描述要做的事。/r 重复上一条命令，/q 退出。",

        (Language::En, MessageKey::PromptUser) => "you> ",
        (Language::Zh, MessageKey::PromptUser) => "你> ",

        (Language::En, MessageKey::PromptInstruction) => "instruction> ",
        (Language::Zh, MessageKey::PromptInstruction) => "指令> ",

        (Language::En, MessageKey::PromptConfirm) => "command> ",
        (Language::Zh, MessageKey::PromptConfirm) => "命令> ",

        (Language::En, MessageKey::ConfirmHint) => {
            "(Enter runs, append ! to regenerate, ~ to abort, prefix ! to run as typed)"
        }
        (Language::Zh, MessageKey::ConfirmHint) => {
            "（回车执行，末尾加 ! 重新生成，加 ~ 放弃，开头加 ! 原样执行）"
        }

        (Language::En, MessageKey::Copied) => "Copied to clipboard",
        (Language::Zh, MessageKey::Copied) => "已复制到剪贴板",

        (Language::En, MessageKey::Deleted) => "Deleted message ",
        (Language::Zh, MessageKey::Deleted) => "已删除消息 ",

        (Language::En, MessageKey::Saved) => "Saved to ",
        (Language::Zh, MessageKey::Saved) => "已保存到 ",

        (Language::En, MessageKey::ClipboardEmpty) => "Clipboard is empty",
        (Language::Zh, MessageKey::ClipboardEmpty) => "剪贴板为空",

        (Language::En, MessageKey::ActiveProfile) => "Profile: ",
        (Language::Zh, MessageKey::ActiveProfile) => "当前配置: ",

        (Language::En, MessageKey::ActiveModel) => "Model: ",
        (Language::Zh, MessageKey::ActiveModel) => "当前模型: ",

        (Language::En, MessageKey::ExitedWithCode) => "exited with code ",
        (Language::Zh, MessageKey::ExitedWithCode) => "退出码 ",

        (Language::En, MessageKey::NoLastCommand) => "No command has been run yet",
        (Language::Zh, MessageKey::NoLastCommand) => "还没有执行过命令",

        (Language::En, MessageKey::Opening) => "Opening ",
        (Language::Zh, MessageKey::Opening) => "正在打开 ",

        (Language::En, MessageKey::SnapshotFailed) => "could not write the conversation snapshot: ",
        (Language::Zh, MessageKey::SnapshotFailed) => "无法写入对话快照：",

        (Language::En, MessageKey::SaveFailed) => "could not save conversation: ",
        (Language::Zh, MessageKey::SaveFailed) => "无法保存对话：",

        (Language::En, MessageKey::ViewFailed) => "could not write view: ",
        (Language::Zh, MessageKey::ViewFailed) => "无法生成预览：",
    }
}
