
#[cfg(test)]
pub mod cons {
    pub mod provider_cons;
}

#[cfg(test)]
pub mod session {
    pub mod state;
    pub mod store;
}

#[cfg(test)]
pub mod llm {
    pub mod models {
        pub mod claude_gateway;
        pub mod openai_compat;
        pub mod provider_handle;
    }
    pub mod utils {
        pub mod string_util;
    }
    pub mod fanout;
    pub mod pricing;
    pub mod title;
}
