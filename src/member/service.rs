use std::collections::HashSet;

use chrono::Utc;

use super::aggregate::{build_member_tree, group_by_position, summarize_generations};
use super::model::{
    CreateMemberRequest, CreatePositionRequest, GenerationSummary, GroupedMembers, Member, MemberListQuery,
    MemberTreeNode, Position, PositionInfo, PositionInfoPatch, UpdateMemberRequest, UpdatePositionRequest,
};
use super::repository::MemberRepository;
use crate::document::new_id;
use crate::error::AppError;
use crate::pagination::PageResult;

pub struct MemberService<R> {
    repo: R,
}

impl<R: MemberRepository> MemberService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub async fn generations(&self) -> Result<GenerationSummary, AppError> {
        Ok(summarize_generations(self.repo.generations().await?))
    }

    /// Members of `generation` (or the latest one) grouped by position.
    ///
    /// The generation lookup completes before the member fetch because the
    /// fetch filter depends on it.
    pub async fn grouped_members(&self, generation: Option<i32>) -> Result<GroupedMembers, AppError> {
        let summary = self.generations().await?;
        let Some(target) = generation.or(summary.current_generation) else {
            return Ok(GroupedMembers::default());
        };

        let members = self.repo.members_in_generation(target).await?;
        let positions = self.repo.positions().await?;

        Ok(GroupedMembers {
            list: group_by_position(&members, &positions, target),
            generations: summary.generations,
            current_generation: summary.current_generation,
        })
    }

    pub async fn member_tree(&self, root_id: Option<&str>) -> Result<Vec<MemberTreeNode>, AppError> {
        let members = self.repo.active_members().await?;
        let positions = self.repo.positions().await?;
        Ok(build_member_tree(&members, &positions, root_id))
    }

    pub async fn list_members(&self, query: &MemberListQuery) -> Result<PageResult<Member>, AppError> {
        self.repo.list_members(query).await
    }

    pub async fn get_member(&self, id: &str) -> Result<Member, AppError> {
        self.repo
            .find_member(id)
            .await?
            .filter(Member::is_active)
            .ok_or_else(|| AppError::NotFound("Member not found".to_string()))
    }

    async fn require_position(&self, id: &str) -> Result<(), AppError> {
        match self.repo.find_position(id).await? {
            Some(_) => Ok(()),
            None => Err(AppError::NotFound("Position not found".to_string())),
        }
    }

    async fn require_parent(&self, id: &str) -> Result<Member, AppError> {
        self.repo
            .find_member(id)
            .await?
            .filter(Member::is_active)
            .ok_or_else(|| AppError::NotFound("Parent member not found".to_string()))
    }

    pub async fn create_member(&self, req: CreateMemberRequest) -> Result<Member, AppError> {
        self.require_position(&req.position).await?;
        if let Some(parent) = req.parent.as_deref() {
            self.require_parent(parent).await?;
        }

        let now = Utc::now();
        let member = Member {
            id: new_id().to_string(),
            en: req.en,
            kh: req.kh,
            position: req.position,
            parent: req.parent,
            generation: req.generation,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };
        self.repo.insert_member(&member).await?;
        Ok(member)
    }

    /// Rejects a parent that is the member itself or one of its descendants.
    async fn check_no_cycle(&self, id: &str, parent: &str) -> Result<(), AppError> {
        let mut seen = HashSet::new();
        let mut cursor = Some(parent.to_string());
        while let Some(current) = cursor {
            if current == id {
                return Err(AppError::BadRequest("A member cannot be its own ancestor".to_string()));
            }
            if !seen.insert(current.clone()) {
                break;
            }
            cursor = self.repo.find_member(&current).await?.and_then(|m| m.parent);
        }
        Ok(())
    }

    pub async fn update_member(&self, id: &str, req: UpdateMemberRequest) -> Result<Member, AppError> {
        let mut member = self.get_member(id).await?;

        if let Some(position) = req.position {
            if position != member.position {
                self.require_position(&position).await?;
                member.position = position;
            }
        }
        match req.parent {
            Some(Some(parent)) => {
                self.require_parent(&parent).await?;
                self.check_no_cycle(id, &parent).await?;
                member.parent = Some(parent);
            }
            Some(None) => member.parent = None,
            None => {}
        }
        if let Some(patch) = req.en {
            patch.apply(&mut member.en);
        }
        if let Some(patch) = req.kh {
            patch.apply(&mut member.kh);
        }
        if let Some(generation) = req.generation {
            member.generation = generation;
        }
        member.updated_at = Utc::now();

        if !self.repo.save_member(&member).await? {
            return Err(AppError::NotFound("Member not found".to_string()));
        }
        Ok(member)
    }

    pub async fn delete_member(&self, id: &str) -> Result<(), AppError> {
        let mut member = self.get_member(id).await?;
        let now = Utc::now();
        member.deleted_at = Some(now);
        member.updated_at = now;
        self.repo.save_member(&member).await?;
        Ok(())
    }

    pub async fn list_positions(&self) -> Result<Vec<Position>, AppError> {
        self.repo.positions().await
    }

    pub async fn get_position(&self, id: &str) -> Result<Position, AppError> {
        self.repo
            .find_position(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Position not found".to_string()))
    }

    async fn check_position(&self, en: &PositionInfo, kh: &PositionInfo, except: Option<&str>) -> Result<(), AppError> {
        if en.title.trim().is_empty() || kh.title.trim().is_empty() {
            return Err(AppError::BadRequest("Position title is required".to_string()));
        }
        // Grouped listings sort by the English level only.
        if en.level != kh.level {
            return Err(AppError::Unprocessable(
                "Position level must be the same in every language".to_string(),
            ));
        }
        if self.repo.position_taken(en, kh, except).await? {
            return Err(AppError::Unprocessable("Position already exists".to_string()));
        }
        Ok(())
    }

    pub async fn create_position(&self, req: CreatePositionRequest) -> Result<Position, AppError> {
        self.check_position(&req.en, &req.kh, None).await?;

        let now = Utc::now();
        let position = Position {
            id: new_id().to_string(),
            en: req.en,
            kh: req.kh,
            created_at: now,
            updated_at: now,
        };
        self.repo.insert_position(&position).await?;
        Ok(position)
    }

    pub async fn update_position(&self, id: &str, req: UpdatePositionRequest) -> Result<Position, AppError> {
        let mut position = self.get_position(id).await?;

        fn merge(info: &mut PositionInfo, patch: PositionInfoPatch) {
            if let Some(title) = patch.title.filter(|t| !t.is_empty()) {
                info.title = title;
            }
            if let Some(level) = patch.level {
                info.level = level;
            }
        }
        if let Some(patch) = req.en {
            merge(&mut position.en, patch);
        }
        if let Some(patch) = req.kh {
            merge(&mut position.kh, patch);
        }

        self.check_position(&position.en, &position.kh, Some(id)).await?;
        position.updated_at = Utc::now();
        self.repo.save_position(&position).await?;
        Ok(position)
    }

    pub async fn delete_position(&self, id: &str) -> Result<(), AppError> {
        if self.repo.position_in_use(id).await? {
            return Err(AppError::Unprocessable("Position is assigned to active members".to_string()));
        }
        if !self.repo.delete_position(id).await? {
            return Err(AppError::NotFound("Position not found".to_string()));
        }
        Ok(())
    }
}
